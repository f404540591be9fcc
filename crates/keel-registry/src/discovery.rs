//! The discovery seam.
//!
//! Something outside this crate finds entity declarations (a source scanner,
//! a build script, a hand-written list) and hands back definitions plus
//! warnings for declarations it could not turn into definitions.

use std::fmt;

use keel_types::EntityDefinition;
use thiserror::Error;

use crate::domain::DomainObject;

/// A declaration that was found but is not a valid entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityWarning {
    pub entity: String,
    pub reason: String,
}

impl EntityWarning {
    pub fn new(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EntityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.reason)
    }
}

/// Output of a discovery run.
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub definitions: Vec<EntityDefinition>,
    pub warnings: Vec<EntityWarning>,
}

/// Failure of the discovery collaborator itself.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },
}

/// Produces entity definitions for a registry.
pub trait Discovery {
    fn discover(&self) -> Result<Discovered, DiscoveryError>;
}

impl<F> Discovery for F
where
    F: Fn() -> Result<Discovered, DiscoveryError>,
{
    fn discover(&self) -> Result<Discovered, DiscoveryError> {
        self()
    }
}

/// In-process discovery over an explicit list of types and definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    found: Discovered,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a [`DomainObject`] type.
    pub fn with<E: DomainObject>(mut self) -> Self {
        self.register::<E>();
        self
    }

    /// Add a ready-made definition.
    pub fn with_definition(mut self, definition: EntityDefinition) -> Self {
        self.add_definition(definition);
        self
    }

    pub fn register<E: DomainObject>(&mut self) {
        match E::definition() {
            Ok(def) if def.name != E::NAME => self.found.warnings.push(EntityWarning::new(
                E::NAME,
                format!("definition is named {:?}", def.name),
            )),
            Ok(def) => self.found.definitions.push(def),
            Err(e) => self
                .found
                .warnings
                .push(EntityWarning::new(E::NAME, e.to_string())),
        }
    }

    pub fn add_definition(&mut self, definition: EntityDefinition) {
        match definition.validate() {
            Ok(()) => self.found.definitions.push(definition),
            Err(e) => self
                .found
                .warnings
                .push(EntityWarning::new(definition.name.clone(), e.to_string())),
        }
    }
}

impl Discovery for StaticDiscovery {
    fn discover(&self) -> Result<Discovered, DiscoveryError> {
        Ok(self.found.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::{ColumnDefinition, PrimaryKey};
    use keel_value::ScalarType;

    #[test]
    fn invalid_definition_becomes_warning() {
        let bad = EntityDefinition {
            name: "Broken".into(),
            key: PrimaryKey::single("Missing"),
            columns: vec![ColumnDefinition::new("Id", ScalarType::Int64)],
        };
        let found = StaticDiscovery::new().with_definition(bad).discover().unwrap();
        assert!(found.definitions.is_empty());
        assert_eq!(found.warnings.len(), 1);
        assert_eq!(found.warnings[0].entity, "Broken");
    }

    #[test]
    fn closures_are_discoveries() {
        let discovery = || -> Result<Discovered, DiscoveryError> {
            Err(DiscoveryError::Parse {
                source_name: "entities.rs".into(),
                message: "unexpected token".into(),
            })
        };
        assert!(matches!(discovery.discover(), Err(DiscoveryError::Parse { .. })));
    }
}
