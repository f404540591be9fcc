//! Foundation types for Keel.
//!
//! Every other Keel crate depends on `keel-types` for the way entities are
//! named, keyed, and addressed.
//!
//! # Key Types
//!
//! - [`Fqn`]: dot-separated fully-qualified entity name
//! - [`PrimaryKey`]: partition and clustering components, parsed from the
//!   declaration grammar by [`key`]
//! - [`EntityDefinition`]: immutable schema of one record type
//! - [`SchemaRef`] / [`EntityInfo`]: the addressing passed to connectors

pub mod entity;
pub mod error;
pub mod fqn;
pub mod key;
pub mod schema;

pub use entity::{ColumnDefinition, EntityDefinition};
pub use error::{TypeError, TypeResult};
pub use fqn::{validate_name, Fqn};
pub use key::{ClusteringKey, EntityTag, PrimaryKey, SortOrder};
pub use schema::{EntityInfo, SchemaRef};
