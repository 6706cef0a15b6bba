//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lower bound for the poll interval in milliseconds.
const MIN_INTERVAL_MS: u64 = 500;

/// Lower bound for the fetch timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 100;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sensor endpoint (e.g., "http://localhost:8085/data.json")
    #[serde(default = "default_url")]
    pub url: String,

    /// Poll interval in milliseconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Fetch timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Web API configuration
    #[serde(default)]
    pub web: WebConfig,

    /// D-Bus configuration
    #[serde(default)]
    pub dbus: DbusConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Whether to serve the HTTP API
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Listen address (e.g., "127.0.0.1:8787")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_true(),
            listen: default_listen(),
        }
    }
}

/// D-Bus bus selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbusBusType {
    /// Try the session bus first, fall back to the system bus.
    #[default]
    Auto,
    /// Session bus (user services).
    Session,
    /// System bus (system services).
    System,
}

/// D-Bus service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbusConfig {
    /// Whether to register the D-Bus service
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Which bus to register on
    #[serde(default)]
    pub bus: DbusBusType,
}

impl Default for DbusConfig {
    fn default() -> Self {
        Self {
            enable: default_true(),
            bus: DbusBusType::default(),
        }
    }
}

// Default value functions
fn default_url() -> String {
    "http://localhost:8085/data.json".to_string()
}

fn default_interval() -> u64 {
    3000
}

fn default_timeout() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8787".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            anyhow::bail!("Sensor url must be http(s): {}", config.url);
        }
        Ok(config)
    }

    /// Poll interval, never shorter than 500ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval.max(MIN_INTERVAL_MS))
    }

    /// Fetch timeout, never shorter than 100ms.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.max(MIN_TIMEOUT_MS))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            interval: default_interval(),
            timeout: default_timeout(),
            web: WebConfig::default(),
            dbus: DbusConfig::default(),
        }
    }
}
