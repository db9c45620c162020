//! Configuration file handling.
//!
//! This module provides loading and saving of lidar configuration from a
//! TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/lidar/config.toml`
//! - macOS: `~/Library/Application Support/lidar/config.toml`
//! - Windows: `%APPDATA%\lidar\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! scan_interval_secs = 60
//! check_interval_secs = 10
//! check_every_secs = 60
//! log_level = "info"
//! fleet = "/etc/lidar/fleet.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Scheduler configuration.
///
/// # Example
///
/// ```no_run
/// use lidar::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Scan every {:?}", config.scan_interval());
/// println!("Check every {:?}", config.check_interval());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between scan passes.
    ///
    /// Default: 60
    pub scan_interval_secs: u64,

    /// Seconds between check passes. Notifications trigger passes in between.
    ///
    /// Default: 10
    pub check_interval_secs: u64,

    /// Minimum age, in seconds, of a resource's last check before a scan
    /// queues another one.
    ///
    /// Default: 60
    pub check_every_secs: u64,

    /// Log filter used when `RUST_LOG` is not set.
    ///
    /// Default: "info"
    pub log_level: String,

    /// Fleet file seeding the in-memory work source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60,
            check_interval_secs: 10,
            check_every_secs: 60,
            log_level: "info".to_string(),
            fleet: None,
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks that both intervals are usable.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(Error::Config("scan_interval_secs must be at least 1".to_string()));
        }
        if self.check_interval_secs == 0 {
            return Err(Error::Config("check_interval_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn check_every(&self) -> Duration {
        Duration::from_secs(self.check_every_secs)
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lidar")
            .join("config.toml")
    }

    /// Renders this configuration as it would be written to disk.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.scan_interval(), Duration::from_secs(60));
        assert_eq!(config.check_interval(), Duration::from_secs(10));
        assert_eq!(config.check_every(), Duration::from_secs(60));
        assert_eq!(config.log_level, "info");
        assert!(config.fleet.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "check_interval_secs = 3\nfleet = \"fleet.toml\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.check_interval_secs, 3);
        assert_eq!(config.scan_interval_secs, 60);
        assert_eq!(config.fleet, Some(PathBuf::from("fleet.toml")));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            scan_interval_secs: 120,
            log_level: "debug".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = Config {
            check_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "scan_interval_secs = \"soon\"").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_to_toml_reflects_overrides() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("scan_interval_secs = 60"));
        assert!(!text.contains("fleet"));

        let config = Config {
            check_every_secs: 300,
            fleet: Some(PathBuf::from("fleet.toml")),
            ..Config::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("check_every_secs = 300"));
        assert!(text.contains("fleet = \"fleet.toml\""));
    }
}
