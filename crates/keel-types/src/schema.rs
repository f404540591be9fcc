use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::EntityDefinition;
use crate::error::{TypeError, TypeResult};

/// Two-level namespace address: scope (tenant) and name prefix
/// (application).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaRef {
    pub scope: String,
    pub name_prefix: String,
}

impl SchemaRef {
    pub fn new(scope: impl Into<String>, name_prefix: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name_prefix: name_prefix.into(),
        }
    }
}

/// Everything a connector needs to address one entity's table.
///
/// Built at registration time and read-only afterward. The definition is
/// shared, so cloning an `EntityInfo` is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityInfo {
    pub schema: SchemaRef,
    pub entity_name: String,
    pub definition: Arc<EntityDefinition>,
}

impl EntityInfo {
    /// Address `definition` under `schema`, using the definition's name as
    /// the entity name.
    pub fn new(schema: SchemaRef, definition: Arc<EntityDefinition>) -> Self {
        Self {
            schema,
            entity_name: definition.name.clone(),
            definition,
        }
    }

    pub fn scope(&self) -> &str {
        &self.schema.scope
    }

    pub fn name_prefix(&self) -> &str {
        &self.schema.name_prefix
    }

    /// Local addressing checks, done before any backend is contacted.
    pub fn validate(&self) -> TypeResult<()> {
        if self.schema.scope.is_empty() {
            return Err(TypeError::InvalidEntityInfo("scope is empty".into()));
        }
        if self.schema.name_prefix.is_empty() {
            return Err(TypeError::InvalidEntityInfo("name prefix is empty".into()));
        }
        if self.entity_name.is_empty() {
            return Err(TypeError::InvalidEntityInfo("entity name is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ColumnDefinition;
    use crate::key::PrimaryKey;
    use keel_value::ScalarType;

    fn def() -> Arc<EntityDefinition> {
        Arc::new(
            EntityDefinition::new(
                "Order",
                PrimaryKey::single("ID"),
                vec![ColumnDefinition::new("ID", ScalarType::Int64)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn entity_name_comes_from_definition() {
        let info = EntityInfo::new(SchemaRef::new("acct", "billing"), def());
        assert_eq!(info.entity_name, "Order");
        assert_eq!(info.scope(), "acct");
        assert_eq!(info.name_prefix(), "billing");
        assert!(info.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_parts() {
        let mut info = EntityInfo::new(SchemaRef::new("acct", "billing"), def());
        info.entity_name.clear();
        assert!(info.validate().is_err());

        let info = EntityInfo::new(SchemaRef::new("", "billing"), def());
        assert!(info.validate().is_err());

        let info = EntityInfo::new(SchemaRef::new("acct", ""), def());
        assert!(info.validate().is_err());
    }
}
