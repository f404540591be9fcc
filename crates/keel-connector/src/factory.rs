//! Backend lookup by identifier.
//!
//! The factory is filled during an explicit setup phase through a
//! [`FactoryBuilder`] and is immutable once built, so lookups need no
//! locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::Connector;
use crate::{keyed, memory};

/// Builds a connector from its config.
pub type Constructor = fn(&ConnectorConfig) -> ConnectorResult<Arc<dyn Connector>>;

/// Collects constructors before the factory is frozen.
#[derive(Default)]
pub struct FactoryBuilder {
    constructors: BTreeMap<String, Constructor>,
}

impl FactoryBuilder {
    /// Register `constructor` under `name`. Names are unique.
    pub fn register(&mut self, name: &str, constructor: Constructor) -> ConnectorResult<()> {
        if name.is_empty() {
            return Err(ConnectorError::InvalidArgument(
                "connector name is empty".into(),
            ));
        }
        if self.constructors.contains_key(name) {
            return Err(ConnectorError::InvalidArgument(format!(
                "connector {name:?} is already registered"
            )));
        }
        self.constructors.insert(name.to_string(), constructor);
        Ok(())
    }

    pub fn build(self) -> ConnectorFactory {
        ConnectorFactory {
            constructors: self.constructors,
        }
    }
}

/// Frozen map from backend identifier to constructor.
pub struct ConnectorFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl ConnectorFactory {
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::default()
    }

    /// A factory with the in-memory backends, `memory` and `keyed`.
    pub fn builtin() -> ConnectorResult<Self> {
        let mut builder = Self::builder();
        memory::register(&mut builder)?;
        keyed::register(&mut builder)?;
        Ok(builder.build())
    }

    /// Construct the connector registered as `name`.
    pub fn create(&self, name: &str, config: &ConnectorConfig) -> ConnectorResult<Arc<dyn Connector>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ConnectorError::UnknownBackend {
                name: name.to_string(),
                known: self.names().map(str::to_string).collect(),
            })?;
        let connector = constructor(config)?;
        info!(connector = name, "connector created");
        Ok(connector)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemoryConnector;

    #[test]
    fn builtin_has_memory_and_keyed() {
        let factory = ConnectorFactory::builtin().unwrap();
        assert_eq!(factory.names().collect::<Vec<_>>(), ["keyed", "memory"]);

        let conn = factory.create("memory", &ConnectorConfig::new()).unwrap();
        assert_eq!(conn.name(), "memory");
        let conn = factory
            .create("keyed", &ConnectorConfig::new().with("auto_create_scopes", "true"))
            .unwrap();
        assert_eq!(conn.name(), "keyed");
    }

    #[test]
    fn unknown_backend_lists_known_ones() {
        let factory = ConnectorFactory::builtin().unwrap();
        match factory.create("cassandra", &ConnectorConfig::new()) {
            Err(ConnectorError::UnknownBackend { name, known }) => {
                assert_eq!(name, "cassandra");
                assert_eq!(known, ["keyed", "memory"]);
            }
            Err(other) => panic!("expected UnknownBackend, got {other:?}"),
            Ok(_) => panic!("expected UnknownBackend"),
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut builder = ConnectorFactory::builder();
        memory::register(&mut builder).unwrap();
        let err = memory::register(&mut builder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn custom_constructors() {
        let mut builder = ConnectorFactory::builder();
        builder
            .register("scratch", |_| {
                Ok(Arc::new(MemoryConnector::new()) as Arc<dyn Connector>)
            })
            .unwrap();
        let factory = builder.build();
        assert!(factory.contains("scratch"));
        assert!(!factory.contains("memory"));
        assert!(factory.create("scratch", &ConnectorConfig::new()).is_ok());
    }

    #[test]
    fn bad_config_fails_construction() {
        let factory = ConnectorFactory::builtin().unwrap();
        let bad = ConnectorConfig::new().with("hosts", "a,b");
        assert!(factory.create("memory", &bad).is_err());
        let bad = ConnectorConfig::new().with("auto_create_scopes", "perhaps");
        assert!(factory.create("keyed", &bad).is_err());
    }
}
