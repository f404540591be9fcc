use keel_connector::ConnectorError;
use keel_registry::RegistryError;
use keel_value::ValueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client config: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("failed to decode {entity} row: {source}")]
    Decode {
        entity: String,
        #[source]
        source: ValueError,
    },
}

impl ClientError {
    /// The connector error behind this one, if any.
    pub fn connector_error(&self) -> Option<&ConnectorError> {
        match self {
            ClientError::Connector(e) => Some(e),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
