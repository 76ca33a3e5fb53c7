//! Configuration loading and validation for Quorum.
//!
//! Loads configuration from `~/.quorum/config.toml` with environment
//! variable overrides. Missing files fall back to defaults; invalid
//! settings are rejected at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.quorum/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the agent registry JSON file.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Directory holding the profile and session stores.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Orchestrator configuration.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Payout configuration.
    #[serde(default)]
    pub payout: PayoutConfig,
}

fn default_registry_path() -> PathBuf {
    AppConfig::config_dir().join("agents.json")
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8031
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Request lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds to collect responses after dispatch. The full window is
    /// always waited, even when every agent answers early.
    #[serde(default = "default_response_wait_secs")]
    pub response_wait_secs: u64,

    /// Seconds after which a response's speed score reaches zero.
    #[serde(default = "default_speed_horizon_secs")]
    pub speed_horizon_secs: f64,

    /// Optional selection cutoff. Absent means select every active agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

fn default_response_wait_secs() -> u64 {
    20
}
fn default_speed_horizon_secs() -> f64 {
    30.0
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            response_wait_secs: default_response_wait_secs(),
            speed_horizon_secs: default_speed_horizon_secs(),
            top_k: None,
        }
    }
}

/// Payout preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Total amount split across a session when no explicit total is given.
    #[serde(default = "default_total")]
    pub default_total: f64,
}

fn default_total() -> f64 {
    1.0
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            default_total: default_total(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quorum/config.toml).
    ///
    /// Environment variable overrides, highest priority:
    /// - `QUORUM_REGISTRY` — registry file path
    /// - `QUORUM_DATA_DIR` — data directory
    /// - `QUORUM_PORT` — gateway port
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(registry) = std::env::var("QUORUM_REGISTRY") {
            config.registry_path = PathBuf::from(registry);
        }
        if let Ok(data_dir) = std::env::var("QUORUM_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(port) = std::env::var("QUORUM_PORT") {
            config.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("QUORUM_PORT is not a port number: {port}"))
            })?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quorum")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.response_wait_secs == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.response_wait_secs must be at least 1".into(),
            ));
        }
        if self.orchestrator.speed_horizon_secs <= 0.0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.speed_horizon_secs must be positive".into(),
            ));
        }
        if self.orchestrator.top_k == Some(0) {
            return Err(ConfigError::ValidationError(
                "orchestrator.top_k must be at least 1 when set".into(),
            ));
        }
        if self.payout.default_total < 0.0 {
            return Err(ConfigError::ValidationError(
                "payout.default_total must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            data_dir: default_data_dir(),
            gateway: GatewayConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            payout: PayoutConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
