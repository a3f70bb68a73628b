//! Configuration loading
//!
//! The config file is TOML with `[database]`, `[api]`, `[settings]` and
//! `[logging]` sections. Only `[api]` is required.

use crate::error::{Result, TrackerError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default poll interval in minutes
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 60;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "PRICE_TRACKER_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Returns the default database path: ~/.local/share/price_tracker/price_tracker.db
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("price_tracker")
        .join("price_tracker.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Minutes between successful cycles
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL_MINUTES,
        }
    }
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_MINUTES
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("price_tracker.log")
}

impl Config {
    /// Read the config file at `path`, applying defaults and the API key override.
    ///
    /// API settings are not checked here; commands that poll call `validate_api`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::parse(&content)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.api.api_key = key;
            }
        }
        Ok(config)
    }

    /// Parse config from TOML text without consulting the environment
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TrackerError::Config(e.to_string()))
    }

    /// Check the settings needed to poll the pricing API
    pub fn validate_api(&self) -> Result<()> {
        if self.api.url.trim().is_empty() {
            return Err(TrackerError::Config("api.url must not be empty".to_string()));
        }
        if self.api.api_key.is_empty() {
            return Err(TrackerError::Config(format!(
                "api.api_key must be set (or provide {})",
                API_KEY_ENV
            )));
        }
        Ok(())
    }

    /// Wait between successful cycles. A zero interval falls back to the default.
    pub fn check_interval(&self) -> Duration {
        let minutes = if self.settings.check_interval == 0 {
            log::warn!(
                "check_interval of 0 minutes is not allowed, using default: {}",
                DEFAULT_CHECK_INTERVAL_MINUTES
            );
            DEFAULT_CHECK_INTERVAL_MINUTES
        } else {
            self.settings.check_interval
        };
        Duration::from_secs(minutes * 60)
    }
}
