use std::collections::HashSet;

use keel_value::ScalarType;
use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::fqn::validate_name;
use crate::key::{EntityTag, PrimaryKey};

/// One column of an entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: ScalarType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, kind: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Immutable schema of one record type.
///
/// Created once when the record type is registered and never mutated. Every
/// key component must name a declared column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub key: PrimaryKey,
    pub columns: Vec<ColumnDefinition>,
}

impl EntityDefinition {
    /// Build and validate a definition.
    pub fn new(
        name: impl Into<String>,
        key: PrimaryKey,
        columns: Vec<ColumnDefinition>,
    ) -> TypeResult<Self> {
        let def = Self {
            name: name.into(),
            key,
            columns,
        };
        def.validate()?;
        Ok(def)
    }

    /// Build from a declaration tag such as `primaryKey=(ID)`. A `name=`
    /// setting in the tag overrides `struct_name`.
    pub fn from_tag(
        struct_name: &str,
        tag: &str,
        columns: Vec<ColumnDefinition>,
    ) -> TypeResult<Self> {
        let tag = EntityTag::parse(tag)?;
        let name = tag.name.unwrap_or_else(|| struct_name.to_string());
        Self::new(name, tag.primary_key, columns)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> TypeResult<()> {
        let invalid = |reason: String| TypeError::InvalidDefinition {
            entity: self.name.clone(),
            reason,
        };

        validate_name(&self.name).map_err(|e| invalid(e.to_string()))?;

        if self.columns.is_empty() {
            return Err(invalid("no columns declared".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_name(&column.name).map_err(|e| invalid(e.to_string()))?;
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("duplicate column {:?}", column.name)));
            }
        }

        if self.key.is_empty() {
            return Err(invalid("primary key has no partition component".into()));
        }

        let mut key_seen = HashSet::new();
        for field in self.key.fields() {
            if !seen.contains(field) {
                return Err(invalid(format!("key component {field:?} is not a column")));
            }
            if !key_seen.insert(field) {
                return Err(invalid(format!("duplicate key component {field:?}")));
            }
        }

        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_kind(&self, name: &str) -> Option<ScalarType> {
        self.column(name).map(|c| c.kind)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Key component names, partition first.
    pub fn key_fields(&self) -> impl Iterator<Item = &str> {
        self.key.fields()
    }

    /// Whether `self` can replace `previous` without losing data: same key,
    /// and every previous column still present with the same kind. New
    /// columns are allowed.
    pub fn check_evolution(&self, previous: &EntityDefinition) -> Result<(), String> {
        if self.key != previous.key {
            return Err(format!(
                "primary key of {} changed from {} to {}",
                self.name, previous.key, self.key
            ));
        }
        for old in &previous.columns {
            match self.column_kind(&old.name) {
                None => return Err(format!("column {}.{} was removed", self.name, old.name)),
                Some(kind) if kind != old.kind => {
                    return Err(format!(
                        "column {}.{} changed type from {} to {}",
                        self.name, old.name, old.kind, kind
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
