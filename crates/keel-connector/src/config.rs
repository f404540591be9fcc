use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// String key/value options handed to a connector constructor.
///
/// Each backend documents the keys it understands and rejects the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorConfig(BTreeMap<String, String>);

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parse `key` as `T`, if present.
    pub fn get_parsed<T>(&self, key: &str) -> ConnectorResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse().map_err(|e| {
                    ConnectorError::InvalidArgument(format!(
                        "config key {key}: cannot parse {raw:?}: {e}"
                    ))
                })
            })
            .transpose()
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> ConnectorResult<bool> {
        Ok(self.get_parsed(key)?.unwrap_or(default))
    }

    /// Fail on any key outside `allowed`.
    pub fn reject_unknown(&self, connector: &str, allowed: &[&str]) -> ConnectorResult<()> {
        match self.0.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(ConnectorError::InvalidArgument(format!(
                "unknown config key {key:?} for the {connector} connector"
            ))),
            None => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnectorConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let config = ConnectorConfig::new()
            .with("auto_create_scopes", "true")
            .with("retries", "x");
        assert!(config.get_bool_or("auto_create_scopes", false).unwrap());
        assert!(!config.get_bool_or("deferred_schema", false).unwrap());
        assert!(config.get_parsed::<u32>("retries").is_err());
        assert_eq!(config.get_parsed::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let config: ConnectorConfig = [("hosts", "a,b")].into_iter().collect();
        let err = config.reject_unknown("memory", &[]).unwrap_err();
        assert!(err.to_string().contains("\"hosts\""));
        assert!(config.reject_unknown("x", &["hosts"]).is_ok());
    }

    #[test]
    fn deserializes_from_a_flat_map() {
        let config: ConnectorConfig =
            serde_json::from_str(r#"{"auto_create_scopes": "true"}"#).unwrap();
        assert_eq!(config.get("auto_create_scopes"), Some("true"));
    }
}
