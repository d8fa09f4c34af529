//! Client configuration
//!
//! Loaded from environment variables:
//!
//! - `REDIS_OBJECTS_SCAN_COUNT`: keys examined per SCAN round trip (default: 10)
//! - `REDIS_OBJECTS_TIMEOUT_MS`: per-command timeout in milliseconds (default: 3000)
//!
//! or from a TOML document with the same fields:
//!
//! ```toml
//! scan_count = 100
//! command_timeout_ms = 500
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod defaults {
    pub fn scan_count() -> usize {
        10
    }
    pub fn command_timeout_ms() -> u64 {
        3000
    }
}

pub const SCAN_COUNT_ENV: &str = "REDIS_OBJECTS_SCAN_COUNT";
pub const TIMEOUT_ENV: &str = "REDIS_OBJECTS_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// COUNT hint sent with every SCAN
    #[serde(default = "defaults::scan_count")]
    pub scan_count: usize,
    /// Upper bound on a single command round trip
    #[serde(default = "defaults::command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            scan_count: defaults::scan_count(),
            command_timeout_ms: defaults::command_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Load from environment variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ClientConfig::default();
        if let Some(raw) = lookup(SCAN_COUNT_ENV) {
            config.scan_count = parse_var(SCAN_COUNT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.command_timeout_ms = parse_var(TIMEOUT_ENV, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan_count".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "command_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
