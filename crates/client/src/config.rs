//! Configuration management for the DocShare client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/docshare/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogTiming;

/// Default backend API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default origin under which secure-download links are built.
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("api_url must start with http:// or https://, got {0}")]
    InvalidApiUrl(String),

    #[error("origin must start with http:// or https://, got {0}")]
    InvalidOrigin(String),

    #[error("refresh_interval_secs must be between 1 and 86400, got {0}")]
    InvalidRefreshInterval(u64),

    #[error("settle_delay_ms must be at most 60000, got {0}")]
    InvalidSettleDelay(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the DocShare client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// General client settings.
    pub client: GeneralConfig,

    /// Backend endpoints.
    pub server: ServerConfig,

    /// File catalog timing.
    pub catalog: CatalogConfig,
}

/// General client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the persisted session.
    pub data_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the REST API.
    pub api_url: String,

    /// Origin used for `secure-download` links.
    pub origin: String,
}

/// File catalog timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Loading state shown after mount, in milliseconds.
    pub settle_delay_ms: u64,

    /// Period of the "last updated" refresh, in seconds.
    pub refresh_interval_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            refresh_interval_secs: 30,
        }
    }
}

impl CatalogConfig {
    /// Timing handed to [`crate::catalog::FileCatalog`].
    pub fn timing(&self) -> CatalogTiming {
        CatalogTiming {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshare")
        .join("config.toml")
}

/// Returns the default data directory path.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshare")
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl ClientConfig {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DOCSHARE_API_URL: Override the REST API base URL
    /// - DOCSHARE_ORIGIN: Override the secure-download origin
    /// - DOCSHARE_LOG_LEVEL: Override log level
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("DOCSHARE_API_URL") {
            tracing::info!("Overriding api_url from environment: {}", url);
            self.server.api_url = url;
        }

        if let Some(origin) = non_empty_env("DOCSHARE_ORIGIN") {
            tracing::info!("Overriding origin from environment: {}", origin);
            self.server.origin = origin;
        }

        if let Some(level) = non_empty_env("DOCSHARE_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.client.log_level = level;
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.server.api_url) {
            return Err(ConfigError::InvalidApiUrl(self.server.api_url.clone()));
        }

        if !is_http_url(&self.server.origin) {
            return Err(ConfigError::InvalidOrigin(self.server.origin.clone()));
        }

        let interval = self.catalog.refresh_interval_secs;
        if !(1..=86400).contains(&interval) {
            return Err(ConfigError::InvalidRefreshInterval(interval));
        }

        if self.catalog.settle_delay_ms > 60_000 {
            return Err(ConfigError::InvalidSettleDelay(self.catalog.settle_delay_ms));
        }

        let level = self.client.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.client.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        self.client.data_dir.join("session.json")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
