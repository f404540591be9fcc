use keel_types::{EntityDefinition, EntityInfo};
use keel_value::FieldValues;

use crate::context::Context;
use crate::error::ConnectorResult;
use crate::types::{BatchResult, Conditions, FieldNameValuePair, Page, SchemaStatus};

/// A handle onto one storage backend.
///
/// All implementations must satisfy these invariants:
/// - Every method checks `ctx` and fails with `Cancelled` once the caller
///   stopped waiting.
/// - Batch methods return `Ok` with one entry per input row, in input order.
///   An `Err` from the batch call itself means nothing was attempted.
/// - Unsupported operations fail with `NotImplemented`.
/// - After `shutdown` succeeds, every call fails.
/// - Addressing and key validation happen before storage is touched.
/// - Implementations are safe to share across threads.
pub trait Connector: Send + Sync {
    /// Backend identifier, as registered with the factory.
    fn name(&self) -> &str;

    // -- schema -------------------------------------------------------------

    /// Validate `definitions` against what the backend holds for
    /// `scope`/`name_prefix` and return the compatible version.
    fn check_schema(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        definitions: &[EntityDefinition],
    ) -> ConnectorResult<i32>;

    /// Apply `definitions`; the result may still be pending.
    fn upsert_schema(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        definitions: &[EntityDefinition],
    ) -> ConnectorResult<SchemaStatus>;

    /// Where `version` stands for `scope`/`name_prefix`.
    fn check_schema_status(
        &self,
        ctx: &Context,
        scope: &str,
        name_prefix: &str,
        version: i32,
    ) -> ConnectorResult<SchemaStatus>;

    // -- scopes -------------------------------------------------------------

    /// Create `scope`. Backends that track scopes reject an existing one
    /// with `AlreadyExists`.
    fn create_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()>;

    /// Remove every row in `scope`, keeping the scope and its schemas.
    fn truncate_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()>;

    /// Remove `scope` with its schemas and rows.
    fn drop_scope(&self, ctx: &Context, scope: &str) -> ConnectorResult<()>;

    /// Whether `scope` exists.
    fn scope_exists(&self, ctx: &Context, scope: &str) -> ConnectorResult<bool>;

    // -- rows ---------------------------------------------------------------

    /// Insert a row, failing with `AlreadyExists` if its key is taken.
    fn create_if_not_exists(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        values: &FieldValues,
    ) -> ConnectorResult<()>;

    /// Read the row at `keys`, limited to `fields` (all fields if empty).
    fn read(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        keys: &FieldValues,
        fields: &[&str],
    ) -> ConnectorResult<FieldValues>;

    /// Insert or replace.
    fn upsert(&self, ctx: &Context, ei: &EntityInfo, values: &FieldValues) -> ConnectorResult<()>;

    /// Delete the row at `keys`. Removing an absent row succeeds.
    fn remove(&self, ctx: &Context, ei: &EntityInfo, keys: &FieldValues) -> ConnectorResult<()>;

    /// Read several rows.
    ///
    /// Default implementation calls `read()` for each key. Backends may
    /// override for fewer round-trips.
    fn multi_read(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        keys: &[FieldValues],
        fields: &[&str],
    ) -> ConnectorResult<BatchResult<FieldValues>> {
        ctx.check()?;
        Ok(keys
            .iter()
            .map(|k| {
                ctx.check()?;
                self.read(ctx, ei, k, fields)
            })
            .collect())
    }

    /// Default implementation calls `upsert()` for each row.
    fn multi_upsert(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        rows: &[FieldValues],
    ) -> ConnectorResult<BatchResult<()>> {
        ctx.check()?;
        Ok(rows
            .iter()
            .map(|r| {
                ctx.check()?;
                self.upsert(ctx, ei, r)
            })
            .collect())
    }

    /// Default implementation calls `remove()` for each key.
    fn multi_remove(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        keys: &[FieldValues],
    ) -> ConnectorResult<BatchResult<()>> {
        ctx.check()?;
        Ok(keys
            .iter()
            .map(|k| {
                ctx.check()?;
                self.remove(ctx, ei, k)
            })
            .collect())
    }

    // -- listings -----------------------------------------------------------

    /// Rows matching `conditions`, in key order. Every partition key column
    /// needs an equality condition.
    fn range(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        conditions: &Conditions,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page>;

    /// Rows whose `field` equals a value, in key order.
    fn search(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        field: &FieldNameValuePair,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page>;

    /// Every row, in key order.
    fn scan(
        &self,
        ctx: &Context,
        ei: &EntityInfo,
        fields: &[&str],
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page>;

    /// Release backend resources. Later calls fail.
    fn shutdown(&self) -> ConnectorResult<()>;
}
