//! Configuration loading and management
//!
//! Handles parsing of `taskbuddy.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "taskbuddy.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// JSON file holding every task
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Where the signed-in session is kept between runs
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Profile used by `login` when no flags are given
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            session_file: default_session_file(),
            identity: IdentityConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("taskbuddy.json")
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".taskbuddy").join("session.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdentityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Logging configuration. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Log to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("data_file cannot be empty".to_string()));
        }
        if self.session_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "session_file cannot be empty".to_string(),
            ));
        }
        if self.log.filter.trim().is_empty() {
            return Err(Error::InvalidConfig("log.filter cannot be empty".to_string()));
        }
        Ok(())
    }
}
