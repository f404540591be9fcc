//! High-level Keel client.
//!
//! A [`Client`] binds a [`Registry`](keel_registry::Registry) of entity
//! types to one [`Connector`](keel_connector::Connector) and exposes typed
//! operations on [`DomainObject`](keel_registry::DomainObject) values.

pub mod client;
pub mod config;
pub mod error;
pub mod testing;

pub use client::{Client, Listing};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
