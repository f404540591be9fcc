//! Clients for application tests.

use std::sync::Arc;

use keel_connector::MemoryConnector;
use keel_registry::{Discovery, Registry};

use crate::client::Client;
use crate::error::ClientResult;

/// Scope used by [`new_client`].
pub const SCOPE: &str = "testing";
/// Name prefix used by [`new_client`].
pub const NAME_PREFIX: &str = "keel.testing";

/// A client over a fresh [`MemoryConnector`] with a fixed scope and prefix.
///
/// Fails if any entity `discovery` finds cannot be registered.
pub fn new_client(discovery: &dyn Discovery) -> ClientResult<Client> {
    let registry = Registry::new(SCOPE, NAME_PREFIX, discovery)?;
    Ok(Client::new(
        Arc::new(registry),
        Arc::new(MemoryConnector::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_connector::Context;
    use keel_registry::{DomainObject, StaticDiscovery};
    use keel_types::{ColumnDefinition, EntityDefinition, TypeResult};
    use keel_value::{required, FieldValues, ScalarType, ValueResult};

    #[derive(Debug, PartialEq)]
    struct Widget {
        id: i64,
    }

    impl DomainObject for Widget {
        const NAME: &'static str = "Widget";

        fn definition() -> TypeResult<EntityDefinition> {
            EntityDefinition::from_tag(
                Self::NAME,
                "primaryKey=ID",
                vec![ColumnDefinition::new("ID", ScalarType::Int64)],
            )
        }

        fn to_values(&self) -> FieldValues {
            FieldValues::from([("ID".to_string(), self.id.into())])
        }

        fn from_values(values: &FieldValues) -> ValueResult<Self> {
            Ok(Self {
                id: required(values, "ID")?,
            })
        }
    }

    #[test]
    fn fixed_scope_and_prefix() {
        let client = new_client(&StaticDiscovery::new().with::<Widget>()).unwrap();
        assert_eq!(client.registry().scope(), "testing");
        assert_eq!(client.registry().name_prefix(), "keel.testing");
        assert_eq!(client.connector().name(), "memory");
        let re = client.registry().find::<Widget>().unwrap();
        assert_eq!(re.fqn().as_str(), "keel.testing.Widget");
    }

    #[test]
    fn memory_round_trip() {
        let client = new_client(&StaticDiscovery::new().with::<Widget>()).unwrap();
        let ctx = Context::background();
        client.initialize(&ctx).unwrap();
        client.upsert(&ctx, &Widget { id: 3 }).unwrap();
        assert_eq!(client.read(&ctx, &Widget { id: 3 }).unwrap(), Widget { id: 3 });
    }

    #[test]
    fn registration_failures_surface() {
        let bad = EntityDefinition {
            name: "Gadget".into(),
            key: keel_types::PrimaryKey::single("Missing"),
            columns: vec![ColumnDefinition::new("ID", ScalarType::Int64)],
        };
        let discovery = StaticDiscovery::new().with_definition(bad);
        assert!(new_client(&discovery).is_err());
    }
}
