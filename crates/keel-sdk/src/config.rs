use keel_connector::ConnectorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Settings for [`Client::from_config`](crate::Client::from_config).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub scope: String,
    pub name_prefix: String,
    /// Factory identifier of the backend.
    pub connector: String,
    pub connector_config: ConnectorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scope: String::new(),
            name_prefix: String::new(),
            connector: "memory".into(),
            connector_config: ConnectorConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(scope: impl Into<String>, name_prefix: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name_prefix: name_prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_connector(mut self, name: impl Into<String>, config: ConnectorConfig) -> Self {
        self.connector = name.into();
        self.connector_config = config;
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.scope.is_empty() {
            return Err(ClientError::Config("scope is required".into()));
        }
        if self.name_prefix.is_empty() {
            return Err(ClientError::Config("name_prefix is required".into()));
        }
        if self.connector.is_empty() {
            return Err(ClientError::Config("connector is required".into()));
        }
        Ok(())
    }
}
