//! Configuration loader. Hasher parameters, store tuning and the log level are
//! read from a JSON file; every section is optional and falls back to the
//! built-in defaults.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::crypto::passwords::HasherConfig;
use crate::error::NativeError;
use crate::store::StoreConfig;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "JOINLY_NATIVE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("config rejected: {0}")]
    Invalid(String),
}

impl From<ConfigError> for NativeError {
    fn from(err: ConfigError) -> Self {
        NativeError::InvalidInput(format!("{err}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeConfig {
    pub hasher: HasherConfig,
    pub store: StoreConfig,
    #[serde(rename = "logLevel")]
    pub log_level: Option<String>,
}

impl NativeConfig {
    /// Loads the file named by `JOINLY_NATIVE_CONFIG`, or returns defaults
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => load_config(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hasher
            .validate()
            .and_then(|_| self.store.validate())
            .map_err(|e| ConfigError::Invalid(format!("{e}")))
    }
}

/// Reads, parses and validates the JSON configuration file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<NativeConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let config: NativeConfig =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    config.validate()?;
    Ok(config)
}
