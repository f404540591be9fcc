//! In-memory connector with real key semantics.
//!
//! Rows live in one ordered map per (scope, name prefix, entity), keyed by
//! primary key: partition components ascending, then clustering components
//! in their declared order. Scopes must be created before use, and schemas
//! are versioned per (scope, name prefix).

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keel_types::{EntityDefinition, EntityInfo};
use keel_value::{FieldValue, FieldValues};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConnectorConfig;
use crate::context::Context;
use crate::error::{ConnectorError, ConnectorResult};
use crate::factory::FactoryBuilder;
use crate::row;
use crate::traits::Connector;
use crate::types::{Conditions, FieldNameValuePair, Operation, Operator, Page, SchemaStatus};

/// Identifier of [`KeyedConnector`] in the factory.
pub const NAME: &str = "keyed";

/// Options for [`KeyedConnector`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedConfig {
    /// Create missing scopes, and tables within them, on first write or
    /// schema call instead of failing with `NotFound`.
    pub auto_create_scopes: bool,
    /// Report schema upserts as pending; the first status poll completes
    /// them.
    pub deferred_schema: bool,
}

impl KeyedConfig {
    /// Read options from factory config. Unknown keys are rejected.
    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        config.reject_unknown(NAME, &["auto_create_scopes", "deferred_schema"])?;
        Ok(Self {
            auto_create_scopes: config.get_bool_or("auto_create_scopes", false)?,
            deferred_schema: config.get_bool_or("deferred_schema", false)?,
        })
    }
}

/// Add the `keyed` backend to `builder`. Config keys: `auto_create_scopes`,
/// `deferred_schema`.
pub fn register(builder: &mut FactoryBuilder) -> ConnectorResult<()> {
    builder.register(NAME, |config: &ConnectorConfig| {
        let config = KeyedConfig::from_config(config)?;
        Ok(Arc::new(KeyedConnector::with_config(config)) as Arc<dyn Connector>)
    })
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
struct KeyPart {
    value: FieldValue,
    descending: bool,
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        let ord = self.value.cmp(&other.value);
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// A primary key in storage order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RowKey(Vec<KeyPart>);

impl RowKey {
    fn new(def: &EntityDefinition, values: Vec<FieldValue>) -> Self {
        let descending = def
            .key
            .partition_keys
            .iter()
            .map(|_| false)
            .chain(def.key.clustering_keys.iter().map(|c| c.descending()));
        Self(
            values
                .into_iter()
                .zip(descending)
                .map(|(value, descending)| KeyPart { value, descending })
                .collect(),
        )
    }

    fn from_row(def: &EntityDefinition, values: &FieldValues) -> ConnectorResult<Self> {
        Ok(Self::new(def, row::key_values(def, values)?))
    }

    fn values(&self) -> Vec<&FieldValue> {
        self.0.iter().map(|p| &p.value).collect()
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|p| p.value.to_string()).collect();
        format!("({})", parts.join(", "))
    }
}

/// One key component inside a continuation token. Doubles travel as their
/// bit pattern so the restart point is exact.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TokenPart {
    DoubleBits(u64),
    Value(FieldValue),
}

impl TokenPart {
    fn new(value: &FieldValue) -> Self {
        match value {
            FieldValue::Double(v) => TokenPart::DoubleBits(v.to_bits()),
            other => TokenPart::Value(other.clone()),
        }
    }

    fn into_value(self) -> FieldValue {
        match self {
            TokenPart::DoubleBits(bits) => FieldValue::Double(f64::from_bits(bits)),
            TokenPart::Value(value) => value,
        }
    }
}

/// Continuation tokens are the hex-encoded JSON of the last returned key.
fn encode_token(key: &RowKey) -> ConnectorResult<String> {
    let parts: Vec<TokenPart> = key.values().into_iter().map(TokenPart::new).collect();
    let json = serde_json::to_vec(&parts).map_err(|e| {
        ConnectorError::InvalidArgument(format!("key {} cannot be encoded: {e}", key.describe()))
    })?;
    Ok(hex::encode(json))
}

fn decode_token(def: &EntityDefinition, token: &str) -> ConnectorResult<RowKey> {
    let malformed =
        |reason: String| ConnectorError::InvalidArgument(format!("malformed continuation token: {reason}"));
    let json = hex::decode(token).map_err(|e| malformed(e.to_string()))?;
    let parts: Vec<TokenPart> =
        serde_json::from_slice(&json).map_err(|e| malformed(e.to_string()))?;
    let values: Vec<FieldValue> = parts.into_iter().map(TokenPart::into_value).collect();
    if values.len() != def.key.len() {
        return Err(malformed(format!(
            "expected {} key components, got {}",
            def.key.len(),
            values.len()
        )));
    }
    for (name, value) in def.key_fields().zip(&values) {
        row::check_field(def, name, value).map_err(|e| malformed(e.to_string()))?;
    }
    Ok(RowKey::new(def, values))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

type Table = BTreeMap<RowKey, FieldValues>;

/// (name prefix, entity name)
type TableId = (String, String);

#[derive(Debug, Default)]
struct SchemaHistory {
    /// Latest accepted version.
    version: i32,
    /// Highest version the backend finished applying.
    applied: i32,
    entities: BTreeMap<String, EntityDefinition>,
}

impl SchemaHistory {
    fn status(&self, version: i32) -> SchemaStatus {
        if version <= self.applied {
            SchemaStatus::applied(version)
        } else {
            SchemaStatus::pending(version)
        }
    }

    /// Check `definitions` against the stored ones. Returns whether applying
    /// them would change anything.
    fn merge_check(
        &self,
        scope: &str,
        name_prefix: &str,
        definitions: &[EntityDefinition],
    ) -> ConnectorResult<bool> {
        let mut changed = false;
        for def in definitions {
            match self.entities.get(&def.name) {
                Some(stored) if stored == def => {}
                Some(stored) => {
                    def.check_evolution(stored)
                        .map_err(|reason| ConnectorError::SchemaIncompatible {
                            scope: scope.to_string(),
                            name_prefix: name_prefix.to_string(),
                            reason,
                        })?;
                    changed = true;
                }
                None => changed = true,
            }
        }
        Ok(changed)
    }
}

#[derive(Debug, Default)]
struct ScopeData {
    schemas: BTreeMap<String, SchemaHistory>,
    tables: BTreeMap<TableId, Table>,
}

#[derive(Debug, Default)]
struct State {
    scopes: BTreeMap<String, ScopeData>,
}

fn missing_scope(scope: &str) -> ConnectorError {
    ConnectorError::NotFound {
        entity: scope.to_string(),
        detail: "scope does not exist".into(),
    }
}

fn missing_table(ei: &EntityInfo) -> ConnectorError {
    ConnectorError::NotFound {
        entity: ei.entity_name.clone(),
        detail: format!(
            "no table in {}/{}; apply the schema first",
            ei.scope(),
            ei.name_prefix()
        ),
    }
}

fn table_id(ei: &EntityInfo) -> TableId {
    (ei.name_prefix().to_string(), ei.entity_name.clone())
}

impl State {
    fn scope(&self, scope: &str) -> ConnectorResult<&ScopeData> {
        self.scopes.get(scope).ok_or_else(|| missing_scope(scope))
    }

    fn scope_mut(&mut self, scope: &str, create: bool) -> ConnectorResult<&mut ScopeData> {
        if create {
            return Ok(self.scopes.entry(scope.to_string()).or_default());
        }
        self.scopes.get_mut(scope).ok_or_else(|| missing_scope(scope))
    }
}

fn check_namespace(scope: &str, name_prefix: &str) -> ConnectorResult<()> {
    if scope.is_empty() {
        return Err(ConnectorError::InvalidArgument("scope is empty".into()));
    }
    if name_prefix.is_empty() {
        return Err(ConnectorError::InvalidArgument("name prefix is empty".into()));
    }
    Ok(())
}

fn check_definitions(definitions: &[EntityDefinition]) -> ConnectorResult<()> {
    if definitions.is_empty() {
        return Err(ConnectorError::InvalidArgument(
            "no entity definitions given".into(),
        ));
    }
    for (i, def) in definitions.iter().enumerate() {
        def.validate()?;
        if definitions[..i].iter().any(|d| d.name == def.name) {
            return Err(ConnectorError::InvalidArgument(format!(
                "entity {} is defined twice",
                def.name
            )));
        }
    }
    Ok(())
}

fn check_limit(limit: usize) -> ConnectorResult<()> {
    if limit == 0 {
        return Err(ConnectorError::InvalidArgument("limit must be positive".into()));
    }
    Ok(())
}

/// Walk `table` in key order after `start`, keeping rows accepted by `keep`,
/// until `limit` rows are collected.
fn paginate(
    ctx: &Context,
    table: &Table,
    start: Option<&RowKey>,
    limit: usize,
    fields: &[&str],
    keep: impl Fn(&FieldValues) -> bool,
) -> ConnectorResult<Page> {
    let lower = match start {
        Some(key) => Bound::Excluded(key),
        None => Bound::Unbounded,
    };
    let mut rows = Vec::new();
    let mut last = None;
    for (key, values) in table.range::<RowKey, _>((lower, Bound::Unbounded)) {
        ctx.check()?;
        if !keep(values) {
            continue;
        }
        if rows.len() == limit {
            let token = last.map(encode_token).transpose()?;
            return Ok(Page { rows, token });
        }
        rows.push(row::project(values, fields));
        last = Some(key);
    }
    Ok(Page { rows, token: None })
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Fully conforming in-memory connector.
///
/// - `create_if_not_exists` enforces key uniqueness
/// - `read` and `remove` address rows by full primary key
/// - `range`, `search` and `scan` page through rows in key order
/// - schema changes must be backward compatible and bump the version
pub struct KeyedConnector {
    config: KeyedConfig,
    state: RwLock<State>,
    closed: AtomicBool,
}

impl KeyedConnector {
    /// An empty connector with default options.
    pub fn new() -> Self {
        Self::with_config(KeyedConfig::default())
    }

    /// An empty connector with `config`.
    pub fn with_config(config: KeyedConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Options this connector was built with.
    pub fn config(&self) -> &KeyedConfig {
        &self.config
    }

    fn read_state(&self) -> ConnectorResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| ConnectorError::BackendUnavailable(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> ConnectorResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| ConnectorError::BackendUnavailable(format!("lock poisoned: {e}")))
    }

    fn begin(&self, ctx: &Context) -> ConnectorResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectorError::BackendUnavailable(
                "keyed connector is shut down".into(),
            ));
        }
        ctx.check()
    }

    fn with_table<T>(
        &self,
        ei: &EntityInfo,
        f: impl FnOnce(&Table) -> ConnectorResult<T>,
    ) -> ConnectorResult<T> {
        let state = self.read_state()?;
        let table = state
            .scope(ei.scope())?
            .tables
            .get(&table_id(ei))
            .ok_or_else(|| missing_table(ei))?;
        f(table)
    }

    fn with_table_mut<T>(
        &self,
        ei: &EntityInfo,
        f: impl FnOnce(&mut Table) -> ConnectorResult<T>,
    ) -> ConnectorResult<T> {
        let auto = self.config.auto_create_scopes;
        let mut state = self.write_state()?;
        let scope = state.scope_mut(ei.scope(), auto)?;
        let table = if auto {
            scope.tables.entry(table_id(ei)).or_default()
        } else {
            scope
                .tables
                .get_mut(&table_id(ei))
                .ok_or_else(|| missing_table(ei))?
        };
        f(table)
    }

    /// Checks before any row is written: addressing, columns and key.
    fn prepare_write(&self, ctx: &Context, ei: &EntityInfo, values: &FieldValues) -> ConnectorResult<RowKey> {
        self.begin(ctx)?;
        row::check_entity_info(ei)?;
        row::check_columns(&ei.definition, values)?;
        RowKey::from_row(&ei.definition, values)
    }

    fn prepare_listing(&self, ctx: &Context, ei: &EntityInfo, fields: &[&str], limit: usize) -> ConnectorResult<()> {
        self.begin(ctx)?;
        row::check_entity_info(ei)?;
        row::check_projection(&ei.definition, fields)?;
        check_limit(limit)
    }
}

impl Default for KeyedConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for KeyedConnector {
    fn name(&self) -> &str {
        NAME
    }

    fn check_schema(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        definitions: &[EntityDefinition],
    ) -> ConnectorResult<i32> {
        self.begin(ctx)?;
        check_namespace(scope, name_prefix)?;
        check_definitions(definitions)?;

        let state = self.read_state()?;
        let data = match state.scope(scope) {
            Ok(data) => data,
            Err(_) if self.config.auto_create_scopes => return Ok(0),
            Err(e) => return Err(e),
        };
        match data.schemas.get(name_prefix) {
            Some(history) => {
                history.merge_check(scope, name_prefix, definitions)?;
                Ok(history.version)
            }
            None => Ok(0),
        }
    }

    fn upsert_schema(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        definitions: &[EntityDefinition],
    ) -> ConnectorResult<SchemaStatus> {
        self.begin(ctx)?;
        check_namespace(scope, name_prefix)?;
        check_definitions(definitions)?;

        let mut state = self.write_state()?;
        let data = state.scope_mut(scope, self.config.auto_create_scopes)?;
        let history = data.schemas.entry(name_prefix.to_string()).or_default();
        if history.merge_check(scope, name_prefix, definitions)? {
            history.version += 1;
            for def in definitions {
                history.entities.insert(def.name.clone(), def.clone());
            }
            if !self.config.deferred_schema {
                history.applied = history.version;
            }
            info!(
                scope,
                prefix = name_prefix,
                version = history.version,
                pending = history.applied < history.version,
                "schema upserted"
            );
        }
        let status = history.status(history.version);
        for def in definitions {
            data.tables
                .entry((name_prefix.to_string(), def.name.clone()))
                .or_default();
        }
        Ok(status)
    }

    fn check_schema_status(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        version: i32,
    ) -> ConnectorResult<SchemaStatus> {
        self.begin(ctx)?;
        check_namespace(scope, name_prefix)?;

        let mut state = self.write_state()?;
        let history = state
            .scope_mut(scope, false)?
            .schemas
            .get_mut(name_prefix)
            .filter(|h| (1..=h.version).contains(&version))
            .ok_or_else(|| ConnectorError::NotFound {
                entity: format!("{scope}/{name_prefix}"),
                detail: format!("schema version {version}"),
            })?;
        let status = history.status(version);
        if !status.is_applied() {
            history.applied = history.version;
            debug!(scope, prefix = name_prefix, version, "deferred schema applied");
        }
        Ok(status)
    }

    fn create_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)?;
        if scope.is_empty() {
            return Err(ConnectorError::InvalidArgument("scope is empty".into()));
        }
        let mut state = self.write_state()?;
        if state.scopes.contains_key(scope) {
            return Err(ConnectorError::AlreadyExists {
                entity: scope.to_string(),
                detail: "scope exists".into(),
            });
        }
        state.scopes.insert(scope.to_string(), ScopeData::default());
        info!(scope, "scope created");
        Ok(())
    }

    fn truncate_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)?;
        let mut state = self.write_state()?;
        let data = state.scope_mut(scope, false)?;
        for table in data.tables.values_mut() {
            table.clear();
        }
        info!(scope, "scope truncated");
        Ok(())
    }

    fn drop_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)?;
        let mut state = self.write_state()?;
        state.scopes.remove(scope).ok_or_else(|| missing_scope(scope))?;
        info!(scope, "scope dropped");
        Ok(())
    }

    fn scope_exists(&self, ctx: &Context, scope: &str) -> ConnectorResult<bool> {
        self.begin(ctx)?;
        Ok(self.read_state()?.scopes.contains_key(scope))
    }

    fn create_if_not_exists(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        values: &FieldValues,
    ) -> ConnectorResult<()> {
        let key = self.prepare_write(ctx, ei, values)?;
        self.with_table_mut(ei, |table| {
            if table.contains_key(&key) {
                return Err(ConnectorError::AlreadyExists {
                    entity: ei.entity_name.clone(),
                    detail: format!("key {}", key.describe()),
                });
            }
            debug!(
                operation = %Operation::CreateIfNotExists,
                scope = ei.scope(),
                entity = %ei.entity_name,
                "row created"
            );
            table.insert(key, values.clone());
            Ok(())
        })
    }

    fn read(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        keys: &FieldValues,
        fields: &[&str],
    ) -> ConnectorResult<FieldValues> {
        self.begin(ctx)?;
        row::check_entity_info(ei)?;
        row::check_projection(&ei.definition, fields)?;
        let key = RowKey::from_row(&ei.definition, keys)?;
        self.with_table(ei, |table| match table.get(&key) {
            Some(values) => Ok(row::project(values, fields)),
            None => Err(ConnectorError::NotFound {
                entity: ei.entity_name.clone(),
                detail: format!("key {}", key.describe()),
            }),
        })
    }

    fn upsert(&self, ctx: &Context, ei: &EntityInfo, values: &FieldValues) -> ConnectorResult<()> {
        let key = self.prepare_write(ctx, ei, values)?;
        self.with_table_mut(ei, |table| {
            let replaced = table.insert(key, values.clone()).is_some();
            debug!(
                operation = %Operation::Upsert,
                scope = ei.scope(),
                entity = %ei.entity_name,
                replaced,
                "row upserted"
            );
            Ok(())
        })
    }

    fn remove(&self, ctx: &Context, ei: &EntityInfo, keys: &FieldValues) -> ConnectorResult<()> {
        self.begin(ctx)?;
        row::check_entity_info(ei)?;
        let key = RowKey::from_row(&ei.definition, keys)?;
        self.with_table_mut(ei, |table| {
            let removed = table.remove(&key).is_some();
            debug!(
                operation = %Operation::Remove,
                scope = ei.scope(),
                entity = %ei.entity_name,
                removed,
                "row removed"
            );
            Ok(())
        })
    }

    fn range(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        conditions: &Conditions,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.prepare_listing(ctx, ei, fields, limit)?;
        let def = &ei.definition;
        for (column, conds) in conditions {
            for cond in conds {
                if cond.value.is_null() {
                    return Err(ConnectorError::InvalidArgument(format!(
                        "condition on {}.{column} compares with null",
                        def.name
                    )));
                }
                row::check_field(def, column, &cond.value)?;
            }
        }
        for partition in &def.key.partition_keys {
            let pinned = conditions
                .get(partition)
                .is_some_and(|conds| conds.iter().any(|c| c.op == Operator::Eq));
            if !pinned {
                return Err(ConnectorError::InvalidArgument(format!(
                    "range on {} needs an equality condition on partition key {partition}",
                    def.name
                )));
            }
        }
        let start = token.map(|t| decode_token(def, t)).transpose()?;

        self.with_table(ei, |table| {
            paginate(ctx, table, start.as_ref(), limit, fields, |values| {
                conditions.iter().all(|(column, conds)| {
                    values
                        .get(column)
                        .is_some_and(|v| conds.iter().all(|c| c.matches(v)))
                })
            })
        })
    }

    fn search(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        field: &FieldNameValuePair,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.prepare_listing(ctx, ei, fields, limit)?;
        row::check_field(&ei.definition, &field.name, &field.value)?;
        let start = token.map(|t| decode_token(&ei.definition, t)).transpose()?;

        self.with_table(ei, |table| {
            paginate(ctx, table, start.as_ref(), limit, fields, |values| {
                values.get(&field.name) == Some(&field.value)
            })
        })
    }

    fn scan(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.prepare_listing(ctx, ei, fields, limit)?;
        let start = token.map(|t| decode_token(&ei.definition, t)).transpose()?;
        self.with_table(ei, |table| {
            paginate(ctx, table, start.as_ref(), limit, fields, |_| true)
        })
    }

    fn shutdown(&self) -> ConnectorResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnectorError::BackendUnavailable(
                "keyed connector is already shut down".into(),
            ));
        }
        self.write_state()?.scopes.clear();
        info!(connector = NAME, "connector shut down");
        Ok(())
    }
}
