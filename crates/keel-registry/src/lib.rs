//! Entity registry for Keel.
//!
//! A [`Registry`] is built once from a scope, a name prefix, and the entity
//! definitions produced by a [`Discovery`] collaborator. It indexes every
//! entity by its fully-qualified name (`prefix.StructName`) and is never
//! mutated afterward, so it can be shared across threads without locking.
//!
//! # Modules
//!
//! - [`domain`]: the [`DomainObject`] trait implemented by record types
//! - [`discovery`]: the discovery seam and [`StaticDiscovery`]
//! - [`registry`]: [`Registry`] and [`RegisteredEntity`]
//! - [`error`]: [`RegistryError`]
//!
//! # Rules
//!
//! 1. Any discovery warning aborts construction; nothing is silently dropped.
//! 2. Two entities mapping to the same FQN abort construction.
//! 3. An empty registry is reported as an error by [`Registry::find_all`].

pub mod discovery;
pub mod domain;
pub mod error;
pub mod registry;

pub use discovery::{Discovered, Discovery, DiscoveryError, EntityWarning, StaticDiscovery};
pub use domain::DomainObject;
pub use error::{EntityErrors, RegistryError, RegistryResult};
pub use registry::{RegisteredEntity, Registry};
