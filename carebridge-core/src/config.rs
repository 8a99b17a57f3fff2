//! Client configuration.
//!
//! Configuration is resolved once at startup, in increasing priority:
//!
//! 1. Built-in defaults ([`ClientConfig::default`])
//! 2. `client.toml` in the platform config directory (or an explicit path)
//! 3. Environment: `CAREBRIDGE_API_URL`, `CAREBRIDGE_DEBUG`
//!
//! Command-line front ends apply their own flags on top. The resulting
//! configuration is fixed for the lifetime of the client.
//!
//! # Example file
//!
//! ```toml
//! base_url = "https://ehr.example.org/api"
//! public_paths = ["/v1/hubs"]
//! debug = false
//! timeout_secs = 30
//!
//! [session]
//! backend = "keyring"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::session::{DEFAULT_SLOT, DurableBackend};

/// Default API base URL (local development backend).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Default refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/v1/auth/refresh";

/// Environment variable overriding the base URL.
pub const ENV_API_URL: &str = "CAREBRIDGE_API_URL";

/// Environment variable enabling debug telemetry.
pub const ENV_DEBUG: &str = "CAREBRIDGE_DEBUG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the config file.
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ClientConfig`].
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,
}

/// Where and how the credential is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Durable backend mirroring the in-memory credential.
    #[serde(default)]
    pub backend: DurableBackend,

    /// Session file location for the `file` backend.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Name of the durable slot.
    #[serde(default = "default_slot")]
    pub slot: String,
}

fn default_slot() -> String {
    DEFAULT_SLOT.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: DurableBackend::default(),
            path: None,
            slot: default_slot(),
        }
    }
}

/// Configuration for the API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,

    /// Path prefixes that never carry a credential and never trigger refresh.
    pub public_paths: Vec<String>,

    /// Refresh endpoint, relative to the base URL.
    pub refresh_path: String,

    /// Emit request/response debug telemetry.
    pub debug: bool,

    /// Per-request timeout. `None` leaves timeouts to the transport.
    pub timeout_secs: Option<u64>,

    /// Credential persistence.
    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            public_paths: vec!["/v1/hubs".to_string()],
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            debug: false,
            timeout_secs: None,
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default location of `client.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("org", "carebridge", "carebridge")
            .ok_or(ConfigError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().join("client.toml"))
    }

    /// Load from the default location and the environment.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Ok(path) => Self::load_from_path(&path)?,
            Err(_) => {
                tracing::debug!("no config directory, using default configuration");
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file, or defaults if it does not exist.
    ///
    /// The environment is not consulted.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("config {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply `CAREBRIDGE_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_DEBUG) {
            self.debug = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Check that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {:?}", other),
            }),
        }
    }

    /// Absolute URL for a request path.
    ///
    /// The path is appended to the base URL verbatim, so a base of
    /// `http://host/api` and a path of `/v1/patients` yield
    /// `http://host/api/v1/patients`.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Whether `path` falls under one of the public prefixes.
    pub fn is_public_path(&self, path: &str) -> bool {
        let path = strip_query(path);
        self.public_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
