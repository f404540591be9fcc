use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keel_types::{EntityDefinition, EntityInfo};
use keel_value::FieldValues;
use tracing::{debug, info};

use crate::config::ConnectorConfig;
use crate::context::Context;
use crate::error::{ConnectorError, ConnectorResult};
use crate::factory::FactoryBuilder;
use crate::row;
use crate::traits::Connector;
use crate::types::{BatchResult, Conditions, FieldNameValuePair, Operation, Page, SchemaStatus};

/// Identifier of [`MemoryConnector`] in the factory.
pub const NAME: &str = "memory";

const SCHEMA_VERSION: i32 = 1;

type Index = HashMap<String, Vec<FieldValues>>;

/// Minimal in-memory connector for tests.
///
/// Rows are kept per entity name, in insertion order, behind one `RwLock`.
/// Scope and name prefix are ignored. Reads return the first stored row of
/// the entity whatever key is asked for. Batch, range, search and scan
/// calls fail with `NotImplemented`. Use [`KeyedConnector`] when a test
/// needs real key semantics.
///
/// [`KeyedConnector`]: crate::KeyedConnector
pub struct MemoryConnector {
    index: RwLock<Index>,
    closed: AtomicBool,
}

impl MemoryConnector {
    /// An empty, open connector.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of rows stored for `entity`.
    pub fn row_count(&self, entity: &str) -> ConnectorResult<usize> {
        Ok(self.read_index()?.get(entity).map_or(0, Vec::len))
    }

    /// Drop every stored row.
    pub fn clear(&self) -> ConnectorResult<()> {
        self.write_index()?.clear();
        Ok(())
    }

    fn read_index(&self) -> ConnectorResult<RwLockReadGuard<'_, Index>> {
        self.index
            .read()
            .map_err(|e| ConnectorError::BackendUnavailable(format!("lock poisoned: {e}")))
    }

    fn write_index(&self) -> ConnectorResult<RwLockWriteGuard<'_, Index>> {
        self.index
            .write()
            .map_err(|e| ConnectorError::BackendUnavailable(format!("lock poisoned: {e}")))
    }

    /// Checks shared by every call: open, not cancelled.
    fn begin(&self, ctx: &Context) -> ConnectorResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectorError::BackendUnavailable(
                "memory connector is shut down".into(),
            ));
        }
        ctx.check()
    }

    fn begin_entity(&self, ctx: &Context, ei: &EntityInfo) -> ConnectorResult<()> {
        self.begin(ctx)?;
        if ei.entity_name.is_empty() {
            return Err(ConnectorError::InvalidArgument("invalid entity info".into()));
        }
        Ok(())
    }

    fn unsupported<T>(&self, ctx: &Context, operation: Operation) -> ConnectorResult<T> {
        self.begin(ctx)?;
        Err(ConnectorError::not_implemented(NAME, operation))
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Add the `memory` backend to `builder`. It accepts no config keys.
pub fn register(builder: &mut FactoryBuilder) -> ConnectorResult<()> {
    builder.register(NAME, |config: &ConnectorConfig| {
        config.reject_unknown(NAME, &[])?;
        Ok(Arc::new(MemoryConnector::new()) as Arc<dyn Connector>)
    })
}

impl Connector for MemoryConnector {
    fn name(&self) -> &str {
        NAME
    }

    fn check_schema(
        &self,
        ctx: &Context,
        _scope: &str,
        _name_prefix: &str,
        _definitions: &[EntityDefinition],
    ) -> ConnectorResult<i32> {
        self.begin(ctx)?;
        Ok(SCHEMA_VERSION)
    }

    fn upsert_schema(
        &self,
        ctx: &Context,
        _scope: &str,
        _name_prefix: &str,
        _definitions: &[EntityDefinition],
    ) -> ConnectorResult<SchemaStatus> {
        self.begin(ctx)?;
        Ok(SchemaStatus::applied(SCHEMA_VERSION))
    }

    fn check_schema_status(
        &self,
        ctx: &Context,
        _scope: &str,
        _name_prefix: &str,
        version: i32,
    ) -> ConnectorResult<SchemaStatus> {
        self.begin(ctx)?;
        Ok(SchemaStatus::applied(version))
    }

    fn create_scope(&self, ctx: &Context, _scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)
    }

    fn truncate_scope(&self, ctx: &Context, _scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)
    }

    fn drop_scope(&self, ctx: &Context, _scope: &str) -> ConnectorResult<()> {
        self.begin(ctx)
    }

    fn scope_exists(&self, ctx: &Context, _scope: &str) -> ConnectorResult<bool> {
        self.begin(ctx)?;
        Ok(true)
    }

    fn create_if_not_exists(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        values: &FieldValues,
    ) -> ConnectorResult<()> {
        self.begin_entity(ctx, ei)?;
        let mut index = self.write_index()?;
        let rows = index.entry(ei.entity_name.clone()).or_default();
        rows.push(values.clone());
        debug!(entity = %ei.entity_name, rows = rows.len(), "memory create");
        Ok(())
    }

    fn read(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        _keys: &FieldValues,
        fields: &[&str],
    ) -> ConnectorResult<FieldValues> {
        self.begin_entity(ctx, ei)?;
        let index = self.read_index()?;
        match index.get(&ei.entity_name).and_then(|rows| rows.first()) {
            Some(first) => Ok(row::project(first, fields)),
            None => Err(ConnectorError::NotFound {
                entity: ei.entity_name.clone(),
                detail: "no rows stored".into(),
            }),
        }
    }

    fn upsert(&self, ctx: &Context, ei: &EntityInfo, values: &FieldValues) -> ConnectorResult<()> {
        self.begin_entity(ctx, ei)?;
        let key = row::key_values(&ei.definition, values)?;
        let mut index = self.write_index()?;
        let rows = index.entry(ei.entity_name.clone()).or_default();
        let existing = rows
            .iter()
            .position(|r| row::key_values(&ei.definition, r).is_ok_and(|k| k == key));
        match existing {
            Some(i) => rows[i] = values.clone(),
            None => rows.push(values.clone()),
        }
        debug!(entity = %ei.entity_name, replaced = existing.is_some(), "memory upsert");
        Ok(())
    }

    fn remove(&self, ctx: &Context, ei: &EntityInfo, keys: &FieldValues) -> ConnectorResult<()> {
        self.begin_entity(ctx, ei)?;
        let key = row::key_values(&ei.definition, keys)?;
        let mut index = self.write_index()?;
        if let Some(rows) = index.get_mut(&ei.entity_name) {
            rows.retain(|r| !row::key_values(&ei.definition, r).is_ok_and(|k| k == key));
        }
        Ok(())
    }

    fn multi_read(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _keys: &[FieldValues],
        _fields: &[&str],
    ) -> ConnectorResult<BatchResult<FieldValues>> {
        self.unsupported(ctx, Operation::MultiRead)
    }

    fn multi_upsert(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _rows: &[FieldValues],
    ) -> ConnectorResult<BatchResult<()>> {
        self.unsupported(ctx, Operation::MultiUpsert)
    }

    fn multi_remove(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _keys: &[FieldValues],
    ) -> ConnectorResult<BatchResult<()>> {
        self.unsupported(ctx, Operation::MultiRemove)
    }

    fn range(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _conditions: &Conditions,
        _fields: &[&str],
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        self.unsupported(ctx, Operation::Range)
    }

    fn search(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _field: &FieldNameValuePair,
        _fields: &[&str],
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        self.unsupported(ctx, Operation::Search)
    }

    fn scan(
        &self,
        ctx: &Context,
        _ei: &EntityInfo,
        _fields: &[&str],
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        self.unsupported(ctx, Operation::Scan)
    }

    fn shutdown(&self) -> ConnectorResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnectorError::BackendUnavailable(
                "memory connector is already shut down".into(),
            ));
        }
        self.write_index()?.clear();
        info!(connector = NAME, "connector shut down");
        Ok(())
    }
}
