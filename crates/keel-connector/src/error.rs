use std::fmt;

use keel_types::{EntityInfo, TypeError};
use keel_value::NullError;
use thiserror::Error;

use crate::types::Operation;

/// Why a context stopped an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelCause {
    Requested,
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Requested => f.write_str("cancelled by caller"),
            CancelCause::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Stable classification of [`ConnectorError`] for callers that branch on
/// the kind of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    NullValue,
    NotImplemented,
    SchemaIncompatible,
    Cancelled,
    BackendUnavailable,
    UnknownBackend,
    Backend,
}

/// Errors from connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("not found: {entity}: {detail}")]
    NotFound { entity: String, detail: String },

    #[error("already exists: {entity}: {detail}")]
    AlreadyExists { entity: String, detail: String },

    /// Malformed addressing, missing key fields, or an unusable predicate or
    /// continuation token.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("null value: {0}")]
    NullValue(String),

    #[error("{operation} is not implemented by the {connector} connector")]
    NotImplemented {
        connector: String,
        operation: Operation,
    },

    #[error("incompatible schema for {scope}/{name_prefix}: {reason}")]
    SchemaIncompatible {
        scope: String,
        name_prefix: String,
        reason: String,
    },

    #[error("operation cancelled: {0}")]
    Cancelled(CancelCause),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("unknown connector {name:?}; known connectors: {}", .known.join(", "))]
    UnknownBackend { name: String, known: Vec<String> },

    /// A backend-originated failure. The message carries only the
    /// operation and addressing; backend detail is reachable via `source()`.
    #[error("{operation} failed for {scope}/{entity}")]
    Backend {
        operation: Operation,
        scope: String,
        entity: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::NotFound { .. } => ErrorKind::NotFound,
            ConnectorError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            ConnectorError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ConnectorError::NullValue(_) => ErrorKind::NullValue,
            ConnectorError::NotImplemented { .. } => ErrorKind::NotImplemented,
            ConnectorError::SchemaIncompatible { .. } => ErrorKind::SchemaIncompatible,
            ConnectorError::Cancelled(_) => ErrorKind::Cancelled,
            ConnectorError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            ConnectorError::UnknownBackend { .. } => ErrorKind::UnknownBackend,
            ConnectorError::Backend { .. } => ErrorKind::Backend,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn is_not_implemented(&self) -> bool {
        self.kind() == ErrorKind::NotImplemented
    }

    pub fn not_implemented(connector: &str, operation: Operation) -> Self {
        ConnectorError::NotImplemented {
            connector: connector.to_string(),
            operation,
        }
    }

    /// Wrap a backend error with operation and addressing context.
    pub fn backend(
        operation: Operation,
        ei: &EntityInfo,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ConnectorError::Backend {
            operation,
            scope: ei.scope().to_string(),
            entity: ei.entity_name.clone(),
            source: source.into(),
        }
    }
}

impl From<TypeError> for ConnectorError {
    fn from(e: TypeError) -> Self {
        ConnectorError::InvalidArgument(e.to_string())
    }
}

impl From<NullError> for ConnectorError {
    fn from(e: NullError) -> Self {
        match e {
            NullError::NullValue => ConnectorError::NullValue(e.to_string()),
            other => ConnectorError::InvalidArgument(other.to_string()),
        }
    }
}

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::{ColumnDefinition, EntityDefinition, PrimaryKey, SchemaRef};
    use keel_value::ScalarType;
    use std::error::Error as _;
    use std::sync::Arc;

    #[test]
    fn backend_errors_hide_detail_in_display() {
        let def = EntityDefinition::new(
            "Order",
            PrimaryKey::single("ID"),
            vec![ColumnDefinition::new("ID", ScalarType::Int64)],
        )
        .unwrap();
        let ei = EntityInfo::new(SchemaRef::new("acct", "billing"), Arc::new(def));
        let err = ConnectorError::backend(Operation::Upsert, &ei, "socket reset by peer 10.0.0.7");

        assert_eq!(err.to_string(), "Upsert failed for acct/Order");
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(
            err.source().map(|s| s.to_string()).as_deref(),
            Some("socket reset by peer 10.0.0.7")
        );
    }

    #[test]
    fn kinds_are_branchable() {
        let err = ConnectorError::not_implemented("memory", Operation::Scan);
        assert!(err.is_not_implemented());
        assert_eq!(err.to_string(), "Scan is not implemented by the memory connector");

        let err = ConnectorError::UnknownBackend {
            name: "cassandra".into(),
            known: vec!["keyed".into(), "memory".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown connector \"cassandra\"; known connectors: keyed, memory"
        );
    }

    #[test]
    fn null_errors_map_to_taxonomy() {
        assert_eq!(ConnectorError::from(NullError::NullValue).kind(), ErrorKind::NullValue);
        assert_eq!(
            ConnectorError::from(NullError::Json("x".into())).kind(),
            ErrorKind::InvalidArgument
        );
    }
}
