//! The Keel connector contract.
//!
//! A [`Connector`] is a handle onto one storage backend. Application code
//! never talks to a backend directly: it resolves an entity through the
//! registry, then passes the resulting [`EntityInfo`](keel_types::EntityInfo)
//! and field values to whichever connector the deployment selected.
//!
//! # Backends
//!
//! - [`MemoryConnector`] (`memory`): minimal reference implementation;
//!   batch and scan operations report [`ConnectorError::NotImplemented`]
//! - [`KeyedConnector`] (`keyed`): full in-memory implementation with key
//!   uniqueness, durable scopes, schema versioning and pagination
//!
//! Backends are looked up by identifier through a [`ConnectorFactory`].
//!
//! # Contract Rules
//!
//! 1. Every operation observes the caller's [`Context`] and fails with
//!    `Cancelled` instead of finishing work nobody is waiting for.
//! 2. Batch calls return one result per input row; a failed row never
//!    blocks or rolls back its siblings.
//! 3. Unsupported operations fail with `NotImplemented`, never with an empty
//!    success.
//! 4. After [`Connector::shutdown`] every call fails.
//! 5. Local validation happens before any storage is touched.

pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod keyed;
pub mod memory;
pub mod row;
pub mod traits;
pub mod types;

pub use config::ConnectorConfig;
pub use context::Context;
pub use error::{CancelCause, ConnectorError, ConnectorResult, ErrorKind};
pub use factory::{ConnectorFactory, FactoryBuilder};
pub use keyed::{KeyedConfig, KeyedConnector};
pub use memory::MemoryConnector;
pub use traits::Connector;
pub use types::{
    BatchResult, Condition, Conditions, FieldNameValuePair, Operation, Operator, Page,
    SchemaState, SchemaStatus,
};
