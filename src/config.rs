//! Client configuration.
//!
//! Read from `<config dir>/ftable/config.toml`:
//!
//! ```toml
//! endpoint = "https://tables.googlelabs.com/api/query"
//! token = "..."
//! max_batch = 500
//! ```
//!
//! `FTABLE_ENDPOINT` and `FTABLE_TOKEN` override the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::client::DEFAULT_MAX_BATCH;
use crate::error::{FtError, FtResult};
use crate::transport::DEFAULT_ENDPOINT;

pub const ENDPOINT_ENV: &str = "FTABLE_ENDPOINT";
pub const TOKEN_ENV: &str = "FTABLE_TOKEN";

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Service query endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Auth token from the credential provider
    #[serde(default)]
    pub token: Option<String>,

    /// Insert statements per request
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_batch() -> usize {
    DEFAULT_MAX_BATCH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            max_batch: default_max_batch(),
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ftable").join("config.toml"))
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> FtResult<Self> {
        let config: Config = toml::from_str(text).map_err(|e| FtError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> FtResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load from `path`, or the default path when it exists, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> FtResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    debug!(path = %path.display(), "loading config");
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };
        config.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
        );
        Ok(config)
    }

    /// Replace endpoint and token with non-empty overrides.
    pub fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }
    }

    fn validate(&self) -> FtResult<()> {
        if self.max_batch == 0 {
            return Err(FtError::Config("max_batch must be at least 1".into()));
        }
        if self.endpoint.is_empty() {
            return Err(FtError::Config("endpoint must not be empty".into()));
        }
        Ok(())
    }
}
