use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid fully-qualified name {fqn:?}: {reason}")]
    InvalidFqn { fqn: String, reason: String },

    /// The primary-key declaration does not follow the grammar.
    #[error("invalid key declaration at offset {offset}: {message}")]
    KeySpec { offset: usize, message: String },

    #[error("invalid definition for entity {entity}: {reason}")]
    InvalidDefinition { entity: String, reason: String },

    #[error("invalid entity info: {0}")]
    InvalidEntityInfo(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
