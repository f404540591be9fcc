use std::fmt;

use keel_types::{Fqn, TypeError};
use thiserror::Error;

use crate::discovery::{DiscoveryError, EntityWarning};

/// Every invalid entity found while building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityErrors(pub Vec<EntityWarning>);

impl EntityErrors {
    pub fn warnings(&self) -> &[EntityWarning] {
        &self.0
    }
}

impl fmt::Display for EntityErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid entit", self.0.len())?;
        f.write_str(if self.0.len() == 1 { "y" } else { "ies" })?;
        for warning in &self.0 {
            write!(f, "; {warning}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EntityErrors {}

/// Errors from registry construction and lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid scope: {0}")]
    InvalidScope(#[source] TypeError),

    #[error("invalid name prefix: {0}")]
    InvalidPrefix(#[source] TypeError),

    /// Discovery found entities with invalid declarations.
    #[error("{0}")]
    InvalidEntities(EntityErrors),

    /// The discovery collaborator itself failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("duplicate registration for {fqn}")]
    DuplicateEntity { fqn: Fqn },

    #[error("failed to find registration for entity {entity}")]
    NotFound { entity: String },

    #[error("registry holds no entities")]
    Empty,
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
