use std::sync::Arc;
use std::time::Duration;

use keel_connector::{
    BatchResult, Conditions, Connector, ConnectorFactory, Context, Page, SchemaStatus,
};
use keel_registry::{Discovery, DomainObject, RegisteredEntity, Registry};
use keel_value::FieldValues;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

const SCHEMA_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One page of decoded entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<E> {
    pub entities: Vec<E>,
    /// Continuation token for the next page; `None` on the last page.
    pub token: Option<String>,
}

/// Typed access to registered entities through one connector.
#[derive(Clone)]
pub struct Client {
    registry: Arc<Registry>,
    connector: Arc<dyn Connector>,
}

impl Client {
    pub fn new(registry: Arc<Registry>, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry,
            connector,
        }
    }

    /// Build the registry from `discovery` and the connector from `factory`.
    pub fn from_config(
        config: &ClientConfig,
        factory: &ConnectorFactory,
        discovery: &dyn Discovery,
    ) -> ClientResult<Self> {
        config.validate()?;
        let registry = Registry::new(&config.scope, &config.name_prefix, discovery)?;
        let connector = factory.create(&config.connector, &config.connector_config)?;
        info!(
            scope = %config.scope,
            prefix = %config.name_prefix,
            connector = %config.connector,
            "client configured"
        );
        Ok(Self::new(Arc::new(registry), connector))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// Create the scope if it is missing and upsert the schema of every
    /// registered entity, waiting until the backend reports it applied.
    pub fn initialize(&self, ctx: &Context) -> ClientResult<SchemaStatus> {
        let scope = self.registry.scope();
        let prefix = self.registry.name_prefix();
        if !self.connector.scope_exists(ctx, scope)? {
            self.connector.create_scope(ctx, scope)?;
        }

        let definitions = self.registry.definitions()?;
        let mut status = self
            .connector
            .upsert_schema(ctx, scope, prefix, &definitions)?;
        while !status.is_applied() {
            debug!(scope, prefix, version = status.version, "waiting for schema");
            let pause = ctx
                .remaining()
                .map_or(SCHEMA_POLL_INTERVAL, |left| left.min(SCHEMA_POLL_INTERVAL));
            std::thread::sleep(pause);
            ctx.check()?;
            status = self
                .connector
                .check_schema_status(ctx, scope, prefix, status.version)?;
        }
        info!(scope, prefix, version = status.version, "client initialized");
        Ok(status)
    }

    /// Insert `entity`, failing if its key is already taken.
    pub fn create_if_not_exists<E: DomainObject>(&self, ctx: &Context, entity: &E) -> ClientResult<()> {
        let re = self.registry.find::<E>()?;
        self.connector
            .create_if_not_exists(ctx, re.entity_info(), &entity.to_values())?;
        Ok(())
    }

    pub fn upsert<E: DomainObject>(&self, ctx: &Context, entity: &E) -> ClientResult<()> {
        let re = self.registry.find::<E>()?;
        self.connector
            .upsert(ctx, re.entity_info(), &entity.to_values())?;
        Ok(())
    }

    /// Fetch the stored row with the same key as `entity`.
    pub fn read<E: DomainObject>(&self, ctx: &Context, entity: &E) -> ClientResult<E> {
        let re = self.registry.find::<E>()?;
        let values = self
            .connector
            .read(ctx, re.entity_info(), &key_of(re, entity), &[])?;
        decode(&values)
    }

    /// Remove the row with the same key as `entity`. Absent rows are fine.
    pub fn remove<E: DomainObject>(&self, ctx: &Context, entity: &E) -> ClientResult<()> {
        let re = self.registry.find::<E>()?;
        self.connector
            .remove(ctx, re.entity_info(), &key_of(re, entity))?;
        Ok(())
    }

    /// Upsert several entities; one result per entity.
    pub fn multi_upsert<E: DomainObject>(
        &self,
        ctx: &Context,
        entities: &[E],
    ) -> ClientResult<BatchResult<()>> {
        let re = self.registry.find::<E>()?;
        let rows: Vec<FieldValues> = entities.iter().map(DomainObject::to_values).collect();
        Ok(self.connector.multi_upsert(ctx, re.entity_info(), &rows)?)
    }

    /// Read several entities by key; one result per entity.
    pub fn multi_read<E: DomainObject>(
        &self,
        ctx: &Context,
        entities: &[E],
    ) -> ClientResult<Vec<ClientResult<E>>> {
        let re = self.registry.find::<E>()?;
        let keys: Vec<FieldValues> = entities.iter().map(|e| key_of(re, e)).collect();
        let results = self.connector.multi_read(ctx, re.entity_info(), &keys, &[])?;
        Ok(results
            .into_iter()
            .map(|r| r.map_err(ClientError::from).and_then(|values| decode(&values)))
            .collect())
    }

    pub fn range<E: DomainObject>(
        &self,
        ctx: &Context,
        conditions: &Conditions,
        token: Option<&str>,
        limit: usize,
    ) -> ClientResult<Listing<E>> {
        let re = self.registry.find::<E>()?;
        let page = self
            .connector
            .range(ctx, re.entity_info(), conditions, &[], token, limit)?;
        decode_page(page)
    }

    pub fn scan<E: DomainObject>(
        &self,
        ctx: &Context,
        token: Option<&str>,
        limit: usize,
    ) -> ClientResult<Listing<E>> {
        let re = self.registry.find::<E>()?;
        let page = self
            .connector
            .scan(ctx, re.entity_info(), &[], token, limit)?;
        decode_page(page)
    }

    pub fn shutdown(&self) -> ClientResult<()> {
        self.connector.shutdown()?;
        Ok(())
    }
}

/// The key columns of `entity`.
fn key_of<E: DomainObject>(re: &RegisteredEntity, entity: &E) -> FieldValues {
    let mut values = entity.to_values();
    let def = re.definition();
    values.retain(|name, _| def.key.contains(name));
    values
}

fn decode<E: DomainObject>(values: &FieldValues) -> ClientResult<E> {
    E::from_values(values).map_err(|source| ClientError::Decode {
        entity: E::NAME.to_string(),
        source,
    })
}

fn decode_page<E: DomainObject>(page: Page) -> ClientResult<Listing<E>> {
    let entities = page
        .rows
        .iter()
        .map(decode)
        .collect::<ClientResult<Vec<E>>>()?;
    Ok(Listing {
        entities,
        token: page.token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_connector::{Condition, ConnectorConfig, ErrorKind};
    use keel_registry::StaticDiscovery;
    use keel_types::{ColumnDefinition, EntityDefinition, TypeResult};
    use keel_value::{optional, required, FieldValue, Null, ScalarType, ValueResult};

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: i64,
        total: i64,
        note: Null<String>,
    }

    impl Order {
        fn new(id: i64, total: i64) -> Self {
            Self {
                id,
                total,
                note: Null::null(),
            }
        }

        fn key(id: i64) -> Self {
            Self::new(id, 0)
        }
    }

    impl DomainObject for Order {
        const NAME: &'static str = "Order";

        fn definition() -> TypeResult<EntityDefinition> {
            EntityDefinition::from_tag(
                Self::NAME,
                "primaryKey=(ID)",
                vec![
                    ColumnDefinition::new("ID", ScalarType::Int64),
                    ColumnDefinition::new("Total", ScalarType::Int64),
                    ColumnDefinition::new("Note", ScalarType::String),
                ],
            )
        }

        fn to_values(&self) -> FieldValues {
            FieldValues::from([
                ("ID".to_string(), self.id.into()),
                ("Total".to_string(), self.total.into()),
                ("Note".to_string(), self.note.clone().into()),
            ])
        }

        fn from_values(values: &FieldValues) -> ValueResult<Self> {
            Ok(Self {
                id: required(values, "ID")?,
                total: required(values, "Total")?,
                note: optional(values, "Note")?,
            })
        }
    }

    fn keyed_client(extra: &[(&str, &str)]) -> Client {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let connector_config: ConnectorConfig = extra.iter().copied().collect();
        let config = ClientConfig::new("acct", "billing").with_connector("keyed", connector_config);
        let factory = ConnectorFactory::builtin().unwrap();
        let client =
            Client::from_config(&config, &factory, &StaticDiscovery::new().with::<Order>()).unwrap();
        client.initialize(&Context::background()).unwrap();
        client
    }

    fn ctx() -> Context {
        Context::background()
    }

    #[test]
    fn order_round_trip() {
        let client = keyed_client(&[]);
        let re = client.registry().find::<Order>().unwrap();
        assert_eq!(re.fqn().as_str(), "billing.Order");

        client.upsert(&ctx(), &Order::new(7, 500)).unwrap();
        let keys = FieldValues::from([("ID".to_string(), 7i64.into())]);
        let row = client
            .connector()
            .read(&ctx(), re.entity_info(), &keys, &["Total"])
            .unwrap();
        assert_eq!(row, FieldValues::from([("Total".to_string(), FieldValue::Int64(500))]));

        let order = client.read(&ctx(), &Order::key(7)).unwrap();
        assert_eq!(order, Order::new(7, 500));
        assert!(!order.note.is_valid());
    }

    #[test]
    fn create_then_remove() {
        let client = keyed_client(&[]);
        let mut order = Order::new(1, 10);
        order.note.set("rush".to_string());
        client.create_if_not_exists(&ctx(), &order).unwrap();
        let err = client.create_if_not_exists(&ctx(), &order).unwrap_err();
        assert_eq!(
            err.connector_error().map(|e| e.kind()),
            Some(ErrorKind::AlreadyExists)
        );
        assert_eq!(client.read(&ctx(), &Order::key(1)).unwrap().note.as_option().map(String::as_str), Some("rush"));

        client.remove(&ctx(), &Order::key(1)).unwrap();
        client.remove(&ctx(), &Order::key(1)).unwrap();
        assert!(client.read(&ctx(), &Order::key(1)).is_err());
    }

    #[test]
    fn batches_report_per_entity() {
        let client = keyed_client(&[]);
        let results = client
            .multi_upsert(&ctx(), &[Order::new(1, 1), Order::new(2, 2)])
            .unwrap();
        assert!(results.iter().all(Result::is_ok));

        let reads = client
            .multi_read(&ctx(), &[Order::key(2), Order::key(3), Order::key(1)])
            .unwrap();
        assert_eq!(reads.len(), 3);
        assert_eq!(reads[0].as_ref().unwrap().total, 2);
        assert!(reads[1].is_err());
        assert_eq!(reads[2].as_ref().unwrap().total, 1);
    }

    #[test]
    fn scan_and_range_decode_pages() {
        let client = keyed_client(&[]);
        for id in 1..=5 {
            client.upsert(&ctx(), &Order::new(id, id * 100)).unwrap();
        }

        let first = client.scan::<Order>(&ctx(), None, 3).unwrap();
        assert_eq!(first.entities.len(), 3);
        let rest = client
            .scan::<Order>(&ctx(), first.token.as_deref(), 3)
            .unwrap();
        assert_eq!(rest.entities.iter().map(|o| o.id).collect::<Vec<_>>(), [4, 5]);
        assert!(rest.token.is_none());

        let conditions = Conditions::from([("ID".to_string(), vec![Condition::equals(4i64)])]);
        let hit = client.range::<Order>(&ctx(), &conditions, None, 10).unwrap();
        assert_eq!(hit.entities, [Order::new(4, 400)]);
    }

    #[test]
    fn deferred_schema_is_awaited() {
        let client = keyed_client(&[("deferred_schema", "true")]);
        let status = client
            .connector()
            .check_schema_status(&ctx(), "acct", "billing", 1)
            .unwrap();
        assert!(status.is_applied());
    }

    #[test]
    fn initialize_is_repeatable() {
        let client = keyed_client(&[]);
        let status = client.initialize(&ctx()).unwrap();
        assert_eq!(status, SchemaStatus::applied(1));
    }

    #[test]
    fn unknown_entity_is_a_registry_error() {
        let config = ClientConfig::new("acct", "billing");
        let factory = ConnectorFactory::builtin().unwrap();
        let client = Client::from_config(&config, &factory, &StaticDiscovery::new()).unwrap();
        let err = client.upsert(&ctx(), &Order::new(1, 1)).unwrap_err();
        assert!(matches!(err, ClientError::Registry(_)));
        assert!(matches!(client.initialize(&ctx()), Err(ClientError::Registry(_))));
    }

    #[test]
    fn bad_config_is_rejected() {
        let factory = ConnectorFactory::builtin().unwrap();
        let discovery = StaticDiscovery::new().with::<Order>();

        let config = ClientConfig::new("", "billing");
        assert!(matches!(
            Client::from_config(&config, &factory, &discovery),
            Err(ClientError::Config(_))
        ));

        let config = ClientConfig::new("acct", "billing").with_connector("nope", ConnectorConfig::new());
        match Client::from_config(&config, &factory, &discovery) {
            Err(ClientError::Connector(e)) => assert_eq!(e.kind(), ErrorKind::UnknownBackend),
            Err(other) => panic!("expected UnknownBackend, got {other:?}"),
            Ok(_) => panic!("expected UnknownBackend"),
        }
    }

    #[test]
    fn shutdown_closes_the_connector() {
        let client = keyed_client(&[]);
        client.shutdown().unwrap();
        assert!(client.upsert(&ctx(), &Order::new(1, 1)).is_err());
    }
}
