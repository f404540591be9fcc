use thiserror::Error;

use crate::scalar::ScalarType;

/// Errors from the null-safe codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NullError {
    /// Access to the value of an invalid (null) optional.
    #[error("value is null")]
    NullValue,

    /// Text that is neither empty, `null`, nor a valid rendering of the kind.
    #[error("cannot parse {text:?} as {kind}: {reason}")]
    Parse {
        kind: ScalarType,
        text: String,
        reason: String,
    },

    /// A well-formed input carrying the wrong kind of scalar.
    #[error("type mismatch: expected {expected}: {detail}")]
    TypeMismatch { expected: ScalarType, detail: String },

    /// The JSON input is not syntactically valid.
    #[error("malformed JSON: {0}")]
    Json(String),
}

/// Result alias for codec operations.
pub type NullResult<T> = Result<T, NullError>;

/// Errors decoding a typed record from a row of field values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("missing field: {0}")]
    MissingField(String),

    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error("field {0} is null")]
    NullField(String),
}

/// Result alias for row decoding.
pub type ValueResult<T> = Result<T, ValueError>;
