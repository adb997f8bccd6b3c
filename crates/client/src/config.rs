//! Client configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/guangyuyun/client.toml`
//! - Windows: `%APPDATA%/guangyuyun/client.toml`
//!
//! Every field is optional in the file; missing ones take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use guangyuyun_protocol::constants::{DEFAULT_BASE_URL, DOWNLOAD_DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Gateway client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Gateway base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token used when an operation is not given one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout, including the body.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: u64,

    #[serde(default = "default_download_chunk_size")]
    pub download_chunk_size: u64,

    /// Continue downloads from an existing partial output file.
    #[serde(default = "default_true")]
    pub resume_downloads: bool,

    /// URL the gateway calls once a large upload is assembled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_link: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    300
}

fn default_upload_chunk_size() -> u64 {
    guangyuyun_transfer::DEFAULT_UPLOAD_CHUNK_SIZE
}

fn default_download_chunk_size() -> u64 {
    DOWNLOAD_DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            upload_chunk_size: default_upload_chunk_size(),
            download_chunk_size: default_download_chunk_size(),
            resume_downloads: default_true(),
            notification_link: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), base_url = %config.base_url, "configuration loaded");
        Ok(config)
    }

    /// Parses and checks a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL: {:?}",
                self.base_url
            )));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Full URL of a gateway endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns the platform-specific configuration file path.
pub fn default_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("guangyuyun").join("client.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("guangyuyun")
            .join("client.toml")
    }
}
