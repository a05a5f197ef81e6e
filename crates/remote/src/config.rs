//! Configuration management for webos-remote.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/webos-remote/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientConfig;
use crate::network::DEFAULT_PORT;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("device address is not set (use --address, WEBOS_REMOTE_ADDRESS or [device] address)")]
    MissingAddress,

    #[error("port must be greater than 0")]
    InvalidPort,

    #[error("connect timeout must be between 1 and 60 seconds, got {0}")]
    InvalidConnectTimeout(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `connect_secs`.
const MAX_CONNECT_SECS: u64 = 60;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// The television to control.
    pub device: DeviceConfig,

    /// Network timeouts.
    pub timeouts: TimeoutsConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Host name or IP address of the television.
    pub address: String,

    /// SSAP WebSocket port.
    pub port: u16,

    /// Key file override. The default lives in the home directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Time allowed for opening the connection.
    pub connect_secs: u64,

    /// Time allowed for each reply (0 = no timeout).
    pub response_secs: u64,

    /// Time allowed for accepting the pairing prompt (0 = no timeout).
    pub pairing_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_PORT,
            key_file: None,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect_secs: 2,
            response_secs: 0,
            pairing_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webos-remote")
        .join("config.toml")
}

fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - WEBOS_REMOTE_ADDRESS: Override the device address
    /// - WEBOS_REMOTE_KEY_FILE: Override the key file path
    /// - WEBOS_REMOTE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("WEBOS_REMOTE_ADDRESS") {
            if !address.is_empty() {
                tracing::info!("Overriding device address from environment: {}", address);
                self.device.address = address;
            }
        }

        if let Ok(key_file) = std::env::var("WEBOS_REMOTE_KEY_FILE") {
            if !key_file.is_empty() {
                tracing::info!("Overriding key_file from environment: {}", key_file);
                self.device.key_file = Some(PathBuf::from(key_file));
            }
        }

        if let Ok(level) = std::env::var("WEBOS_REMOTE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }

        if self.device.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let connect = self.timeouts.connect_secs;
        if connect == 0 || connect > MAX_CONNECT_SECS {
            return Err(ConfigError::InvalidConnectTimeout(connect));
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Builds the client settings from this configuration.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.device.address.trim())
            .with_port(self.device.port)
            .with_connect_timeout(Duration::from_secs(self.timeouts.connect_secs))
            .with_response_timeout(optional_secs(self.timeouts.response_secs))
            .with_pairing_timeout(optional_secs(self.timeouts.pairing_secs));

        if let Some(key_file) = &self.device.key_file {
            config = config.with_key_file(key_file);
        }
        config
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
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

    /// Writes this configuration to `path` as TOML.
    ///
    /// An existing file is kept unless `overwrite` is set. Missing parent
    /// directories are created.
    pub fn save<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<()> {
        let path = path.as_ref();

        if path.exists() && !overwrite {
            anyhow::bail!(
                "Config file already exists: {} (use --force to replace it)",
                path.display()
            );
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Wrote configuration");
        Ok(())
    }

    /// The TOML text [`Config::save`] writes.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
