//! Configuration loading for courier-client.
//!
//! Configuration is loaded from an optional TOML file; every field has a
//! default matching a local development backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_types::Credential;
use reqwest::Url;
use serde::Deserialize;

/// Root configuration for the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Backend location.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Size and time limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Backend location.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base HTTP URL of the messaging backend (default: http://127.0.0.1:8000).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Size and time limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Largest attachment accepted for upload in bytes (default: 5MB).
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
    /// Timeout for a whole REST request in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for establishing a connection in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_max_attachment_bytes() -> usize {
    5 * 1024 * 1024 // 5MB, the backend's limit
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_attachment_bytes: default_max_attachment_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override the backend URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.backend.base_url = base_url.into();
        self
    }

    /// Parsed backend base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.backend.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.backend.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidUrl(format!(
                "unsupported scheme {}",
                other
            ))),
        }
    }

    /// URL of a REST endpoint below the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url()?
            .join(path)
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))
    }

    /// Live channel URL for `credential`: `ws(s)://<host>/ws/chat/?token=...`.
    pub fn channel_url(&self, credential: &Credential) -> Result<Url, ConfigError> {
        let mut url = self.endpoint("/ws/chat/")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::InvalidUrl(format!("cannot switch to {}", scheme)))?;
        url.query_pairs_mut().append_pair("token", credential.as_str());
        Ok(url)
    }

    /// Timeout for a whole REST request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.request_timeout_secs)
    }

    /// Timeout for establishing a connection.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.connect_timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Backend URL is not usable.
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    /// HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}
