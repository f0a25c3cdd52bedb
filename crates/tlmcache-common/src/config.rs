//! Configuration types
//!
//! The cache is configured from a TOML file; binaries let command line
//! arguments override individual values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Location of the cache file
    #[serde(default = "default_cache_file_path")]
    pub cache_file_path: PathBuf,
    /// JSON-lines telemetry table used as the upstream source by the CLI
    #[serde(default)]
    pub telemetry_table_path: Option<PathBuf>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_file_path: default_cache_file_path(),
            telemetry_table_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_cache_file_path() -> PathBuf {
    PathBuf::from("./tlm-cache.redb")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CacheConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
