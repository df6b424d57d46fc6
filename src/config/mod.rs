//! Tool configuration
//!
//! Three layers, later wins:
//! 1. Built-in defaults (the buckets/regions the publishing pipeline uses)
//! 2. Config file (~/.config/rocky-publish/config.toml, or --config PATH)
//! 3. CLI flags

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Effective tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Bucket holding build artifacts
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Region the artifact bucket lives in
    #[serde(default = "default_storage_region")]
    pub storage_region: String,

    /// Reference region for cross-region comparison
    #[serde(default = "default_source_region")]
    pub source_region: String,
}

fn default_bucket() -> String {
    "resf-empanadas".to_string()
}

fn default_storage_region() -> String {
    "us-east-2".to_string()
}

fn default_source_region() -> String {
    "us-east-1".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            storage_region: default_storage_region(),
            source_region: default_source_region(),
        }
    }
}

/// Errors from loading the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ToolConfig {
    /// Load configuration.
    ///
    /// An explicit `--config` path must exist; the default location is
    /// optional and built-in defaults apply when it is absent.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit_path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location under the user's home
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| Path::new(&home).join(".config/rocky-publish/config.toml"))
    }
}
