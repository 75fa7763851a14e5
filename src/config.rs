//! Environment configuration.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use waypoint_editor::{ConcurrencyMode, DeletePolicy, EditorConfig};

pub const DATABASE_URL: &str = "WAYPOINT_DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS: &str = "WAYPOINT_DATABASE_MAX_CONNECTIONS";
pub const DELETE_POLICY: &str = "WAYPOINT_DELETE_POLICY";
pub const CONCURRENCY: &str = "WAYPOINT_CONCURRENCY";
pub const ASSET_BASE_URL: &str = "WAYPOINT_ASSET_BASE_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value for {key}: {value:?} (expected {expected})")]
  Invalid {
    key: &'static str,
    value: String,
    expected: &'static str,
  },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointConfig {
  pub database_url: String,
  pub max_connections: u32,
  #[serde(default)]
  pub editor: EditorConfig,
}

impl Default for WaypointConfig {
  fn default() -> Self {
    Self {
      database_url: "sqlite::memory:".to_string(),
      max_connections: 5,
      editor: EditorConfig::default(),
    }
  }
}

impl WaypointConfig {
  /// Load `.env` if present, then read `WAYPOINT_*` variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    let _ = dotenvy::dotenv();
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Build the configuration from any key lookup. Unset or empty keys keep
  /// their defaults; values that do not parse are errors.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut config = Self::default();

    if let Some(url) = get(DATABASE_URL) {
      config.database_url = url;
    }

    if let Some(value) = get(DATABASE_MAX_CONNECTIONS) {
      config.max_connections = value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid(DATABASE_MAX_CONNECTIONS, value, "a positive integer"))?;
    }

    if let Some(value) = get(DELETE_POLICY) {
      let policy = match value.trim() {
        "reconnect_first" => Some(DeletePolicy::ReconnectFirst),
        "reconnect_all" => Some(DeletePolicy::ReconnectAll),
        _ => None,
      };
      config.editor.delete_policy =
        policy.ok_or_else(|| invalid(DELETE_POLICY, value, "reconnect_first or reconnect_all"))?;
    }

    if let Some(value) = get(CONCURRENCY) {
      let mode = match value.trim() {
        "last_writer_wins" => Some(ConcurrencyMode::LastWriterWins),
        "optimistic" => Some(ConcurrencyMode::Optimistic),
        _ => None,
      };
      config.editor.concurrency =
        mode.ok_or_else(|| invalid(CONCURRENCY, value, "last_writer_wins or optimistic"))?;
    }

    if let Some(url) = get(ASSET_BASE_URL) {
      config.editor.asset_base_url = url;
    }

    Ok(config)
  }
}

fn invalid(key: &'static str, value: String, expected: &'static str) -> ConfigError {
  ConfigError::Invalid {
    key,
    value,
    expected,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| vars.get(key).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = WaypointConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, WaypointConfig::default());
    assert_eq!(config.editor.delete_policy, DeletePolicy::ReconnectFirst);
    assert_eq!(config.editor.concurrency, ConcurrencyMode::LastWriterWins);
  }

  #[test]
  fn test_reads_all_keys() {
    let config = WaypointConfig::from_lookup(lookup(&[
      (DATABASE_URL, "sqlite://waypoint.db"),
      (DATABASE_MAX_CONNECTIONS, "8"),
      (DELETE_POLICY, "reconnect_all"),
      (CONCURRENCY, "optimistic"),
      (ASSET_BASE_URL, "https://cdn.example.com/assets/"),
    ]))
    .unwrap();

    assert_eq!(config.database_url, "sqlite://waypoint.db");
    assert_eq!(config.max_connections, 8);
    assert_eq!(config.editor.delete_policy, DeletePolicy::ReconnectAll);
    assert_eq!(config.editor.concurrency, ConcurrencyMode::Optimistic);
    assert_eq!(config.editor.asset_base_url, "https://cdn.example.com/assets/");
  }

  #[test]
  fn test_empty_values_keep_defaults() {
    let config = WaypointConfig::from_lookup(lookup(&[(DELETE_POLICY, "  ")])).unwrap();
    assert_eq!(config.editor.delete_policy, DeletePolicy::ReconnectFirst);
  }

  #[test]
  fn test_invalid_values_are_errors() {
    let err = WaypointConfig::from_lookup(lookup(&[(CONCURRENCY, "pessimistic")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: CONCURRENCY, .. }));

    let err = WaypointConfig::from_lookup(lookup(&[(DATABASE_MAX_CONNECTIONS, "0")])).unwrap_err();
    assert!(matches!(
      err,
      ConfigError::Invalid {
        key: DATABASE_MAX_CONNECTIONS,
        ..
      }
    ));
  }
}
