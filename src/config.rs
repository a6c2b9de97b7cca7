//! Panel configuration file
//!
//! Read from `--config` or the platform default:
//! - Linux: ~/.config/eridanus-webui/config.toml
//! - macOS: ~/Library/Application Support/eridanus-webui/config.toml
//! - Windows: %APPDATA%\eridanus-webui\config.toml
//!
//! A missing file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::fs_utils;
use crate::relay::protocol::RelayIdentity;
use crate::session::DEFAULT_SESSION_TTL_SECS;

/// Panel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PanelConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where plugin configuration lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per plugin
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("run")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
        }
    }
}

/// Relay socket settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_relay_host")]
    pub host: String,

    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Upper bound on a single delivery to one peer
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Outbound frames buffered per peer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub identity: RelayIdentity,
}

fn default_relay_host() -> String {
    "0.0.0.0".to_string()
}

fn default_relay_port() -> u16 {
    5008
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            send_timeout_ms: default_send_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            identity: RelayIdentity::default(),
        }
    }
}

impl RelayConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Login session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    3_600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl PanelConfig {
    /// Platform default location of the config file
    pub fn default_path() -> PathBuf {
        fs_utils::config_base_dir().join("config.toml")
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::default_path()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| PanelError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| PanelError::ConfigError {
            message: format!("Failed to parse config: {}", e),
        })
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PanelError::WriteFailure {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| PanelError::ConfigError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs_utils::write_atomic(path, content.as_bytes()).map_err(|e| PanelError::WriteFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get a configuration value by key path (e.g., "relay.port")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        let identity = &self.relay.identity;
        match parts.as_slice() {
            ["paths", "run_dir"] => Some(self.paths.run_dir.display().to_string()),
            ["relay", "host"] => Some(self.relay.host.clone()),
            ["relay", "port"] => Some(self.relay.port.to_string()),
            ["relay", "send_timeout_ms"] => Some(self.relay.send_timeout_ms.to_string()),
            ["relay", "queue_capacity"] => Some(self.relay.queue_capacity.to_string()),
            ["relay", "identity", "self_id"] => Some(identity.self_id.to_string()),
            ["relay", "identity", "user_id"] => Some(identity.user_id.to_string()),
            ["relay", "identity", "group_id"] => Some(identity.group_id.to_string()),
            ["relay", "identity", "message_id"] => Some(identity.message_id.to_string()),
            ["relay", "identity", "nickname"] => Some(identity.nickname.clone()),
            ["relay", "identity", "mention_name"] => Some(identity.mention_name.clone()),
            ["relay", "identity", "font"] => Some(identity.font.to_string()),
            ["session", "ttl_secs"] => Some(self.session.ttl_secs.to_string()),
            ["session", "sweep_interval_secs"] => Some(self.session.sweep_interval_secs.to_string()),
            ["logging", "level"] => Some(self.logging.level.clone()),
            _ => None,
        }
    }

    /// Set a configuration value by key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let identity = &mut self.relay.identity;
        match parts.as_slice() {
            ["paths", "run_dir"] => self.paths.run_dir = PathBuf::from(value),
            ["relay", "host"] => self.relay.host = value.to_string(),
            ["relay", "port"] => self.relay.port = parse_number(key, value)?,
            ["relay", "send_timeout_ms"] => self.relay.send_timeout_ms = parse_number(key, value)?,
            ["relay", "queue_capacity"] => {
                let capacity: usize = parse_number(key, value)?;
                if capacity == 0 {
                    return Err(PanelError::ConfigError {
                        message: "relay.queue_capacity must be at least 1".to_string(),
                    });
                }
                self.relay.queue_capacity = capacity;
            }
            ["relay", "identity", "self_id"] => identity.self_id = parse_number(key, value)?,
            ["relay", "identity", "user_id"] => identity.user_id = parse_number(key, value)?,
            ["relay", "identity", "group_id"] => identity.group_id = parse_number(key, value)?,
            ["relay", "identity", "message_id"] => identity.message_id = parse_number(key, value)?,
            ["relay", "identity", "nickname"] => identity.nickname = value.to_string(),
            ["relay", "identity", "mention_name"] => identity.mention_name = value.to_string(),
            ["relay", "identity", "font"] => identity.font = parse_number(key, value)?,
            ["session", "ttl_secs"] => self.session.ttl_secs = parse_number(key, value)?,
            ["session", "sweep_interval_secs"] => {
                self.session.sweep_interval_secs = parse_number(key, value)?
            }
            ["logging", "level"] => {
                if !LOG_LEVELS.contains(&value) {
                    return Err(PanelError::ConfigError {
                        message: format!(
                            "Invalid log level: {}. Must be one of: {}",
                            value,
                            LOG_LEVELS.join(", ")
                        ),
                    });
                }
                self.logging.level = value.to_string();
            }
            _ => {
                return Err(PanelError::ConfigError {
                    message: format!("Unknown configuration key: {}", key),
                });
            }
        }
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Configuration as TOML text
    pub fn display(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|e| format!("# failed to render config: {}\n", e))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| PanelError::ConfigError {
        message: format!("Invalid number for {}: {}", key, value),
    })
}
