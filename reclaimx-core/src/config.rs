//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/reclaimx/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/reclaimx/` (~/.config/reclaimx/)
//! - Data: `$XDG_DATA_HOME/reclaimx/` (~/.local/share/reclaimx/)
//! - State/Logs: `$XDG_STATE_HOME/reclaimx/` (~/.local/state/reclaimx/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Table locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the user and report tables live
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding both tables. Defaults to the XDG data directory.
    pub data_dir: Option<PathBuf>,

    /// File name of the user table
    #[serde(default = "default_users_file")]
    pub users_file: String,

    /// File name of the report table
    #[serde(default = "default_reports_file")]
    pub reports_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            users_file: default_users_file(),
            reports_file: default_reports_file(),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at an explicit directory with default file names
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Config::data_dir)
    }

    /// Full path of the user table
    pub fn users_path(&self) -> PathBuf {
        self.data_dir().join(&self.users_file)
    }

    /// Full path of the report table
    pub fn reports_path(&self) -> PathBuf {
        self.data_dir().join(&self.reports_file)
    }
}

fn default_users_file() -> String {
    "users.csv".to_string()
}

fn default_reports_file() -> String {
    "reports.csv".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/reclaimx/config.toml` (~/.config/reclaimx/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("reclaimx").join("config.toml")
    }

    /// Returns the data directory path (for the record tables)
    ///
    /// `$XDG_DATA_HOME/reclaimx/` (~/.local/share/reclaimx/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("reclaimx")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/reclaimx/` (~/.local/state/reclaimx/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("reclaimx")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/reclaimx/reclaimx.log` (~/.local/state/reclaimx/reclaimx.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("reclaimx.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.storage.data_dir.is_none());
        assert_eq!(config.storage.users_file, "users.csv");
        assert_eq!(config.storage.reports_file, "reports.csv");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[storage]
data_dir = "/srv/reclaimx"
reports_file = "data.csv"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.storage.reports_path(),
            PathBuf::from("/srv/reclaimx/data.csv")
        );
        assert_eq!(
            config.storage.users_path(),
            PathBuf::from("/srv/reclaimx/users.csv")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_storage_in_dir() {
        let storage = StorageConfig::in_dir("/tmp/campus");
        assert_eq!(storage.users_path(), PathBuf::from("/tmp/campus/users.csv"));
    }

    #[test]
    fn test_load_from_missing_file_is_config_error() {
        let err = Config::load_from(Path::new("/nonexistent/reclaimx.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
