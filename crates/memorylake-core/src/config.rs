//! Client configuration.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (MEMORYLAKE_*)
//! 2. Config file ($MEMORYLAKE_CONFIG or ~/.memorylake/config.toml)
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Default MemoryLake API host
pub const DEFAULT_HOST: &str = "https://api.memorylake.ai";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const ENV_API_KEY: &str = "MEMORYLAKE_API_KEY";
pub const ENV_HOST: &str = "MEMORYLAKE_HOST";
pub const ENV_ORG_ID: &str = "MEMORYLAKE_ORG_ID";
pub const ENV_PROJECT_ID: &str = "MEMORYLAKE_PROJECT_ID";
pub const ENV_CONFIG: &str = "MEMORYLAKE_CONFIG";

/// Connection and scoping settings for the memory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing path
    pub host: String,

    /// API key sent as `Authorization: Token <key>`
    pub api_key: Option<String>,

    /// Organization scope (must be set together with `project_id`)
    pub org_id: Option<String>,

    /// Project scope (must be set together with `org_id`)
    pub project_id: Option<String>,

    /// Request timeout in seconds (default: 300)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: None,
            org_id: None,
            project_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Create a config for the default host with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Set the API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Scope requests to an organization and project
    pub fn with_scope(mut self, org_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load configuration from the default file and the environment.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ConfigValidationError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    ///
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.host = host;
        }
        if let Some(api_key) = get(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(org_id) = get(ENV_ORG_ID) {
            self.org_id = Some(org_id);
        }
        if let Some(project_id) = get(ENV_PROJECT_ID) {
            self.project_id = Some(project_id);
        }
        self
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".memorylake")
                .join("config.toml")
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigValidationError::MissingApiKey),
        }

        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidValue {
                field: "host".into(),
                message: "must start with http:// or https://".into(),
            });
        }

        if self.org_id.is_some() != self.project_id.is_some() {
            return Err(ConfigValidationError::PartialScope);
        }

        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("api_key is required (set MEMORYLAKE_API_KEY or api_key in the config file)")]
    MissingApiKey,

    #[error("org_id and project_id must be set together")]
    PartialScope,

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
