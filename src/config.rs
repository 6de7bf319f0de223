//! Configuration for the search pipeline and its record set.
//!
//! Configuration is stored in TOML format at `~/.config/roster/config.toml`
//! (or XDG equivalent). Every section is optional; a missing file yields the
//! defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [timing]
//! debounce_ms = 1000
//! filter_latency_ms = 2000
//! linger_ms = 5000
//!
//! # Replaces the built-in sample roster when present
//! [[records]]
//! first_name = "Ryan"
//! last_name = "Winthrop"
//!
//! [[records]]
//! first_name = "John"
//! last_name = "Smith"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::model::types::Record;
use crate::search::Timing;

/// Errors that can occur when loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RosterConfig {
    /// Pipeline time windows.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Records to search. `None` means the built-in sample roster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Record>>,
}

/// Time windows in milliseconds, as written in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub filter_latency_ms: u64,
    pub linger_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Timing::default().into()
    }
}

impl From<TimingConfig> for Timing {
    fn from(cfg: TimingConfig) -> Self {
        Self {
            debounce: Duration::from_millis(cfg.debounce_ms),
            filter_latency: Duration::from_millis(cfg.filter_latency_ms),
            linger: Duration::from_millis(cfg.linger_ms),
        }
    }
}

impl From<Timing> for TimingConfig {
    fn from(timing: Timing) -> Self {
        let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self {
            debounce_ms: millis(timing.debounce),
            filter_latency_ms: millis(timing.filter_latency),
            linger_ms: millis(timing.linger),
        }
    }
}

impl RosterConfig {
    /// Load configuration from the default location.
    ///
    /// Returns the default config if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config_missing_using_defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            records = ?config.records.as_ref().map(Vec::len),
            "config_loaded"
        );
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// Uses XDG conventions:
    /// - Primary: `$XDG_CONFIG_HOME/roster/config.toml`
    /// - Fallback: platform-specific config dir (e.g., `~/.config/roster/config.toml` on Linux)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("roster").join("config.toml"));
        }

        dirs::config_dir()
            .map(|p| p.join("roster").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Validate the configured records.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(records) = &self.records else {
            return Ok(());
        };

        if records.is_empty() {
            return Err(ConfigError::Validation(
                "records table is present but empty".into(),
            ));
        }

        for (idx, record) in records.iter().enumerate() {
            if record.first_name.trim().is_empty() || record.last_name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "record {idx} has an empty name"
                )));
            }
        }

        Ok(())
    }

    pub fn timing(&self) -> Timing {
        self.timing.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RosterConfig::default();
        assert!(config.records.is_none());
        assert_eq!(config.timing(), Timing::default());
        assert_eq!(config.timing.debounce_ms, 1000);
        assert_eq!(config.timing.filter_latency_ms, 2000);
        assert_eq!(config.timing.linger_ms, 5000);
    }

    #[test]
    fn test_partial_timing_fills_defaults() {
        let config: RosterConfig = toml::from_str("[timing]\ndebounce_ms = 250\n").unwrap();
        assert_eq!(config.timing.debounce_ms, 250);
        assert_eq!(config.timing.filter_latency_ms, 2000);
        assert_eq!(config.timing.linger_ms, 5000);
        assert_eq!(config.timing().debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_records_parse() {
        let config: RosterConfig = toml::from_str(
            r#"
            [[records]]
            first_name = "Ryan"
            last_name = "Winthrop"

            [[records]]
            first_name = "John"
            last_name = "Smith"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.records,
            Some(vec![
                Record::new("Ryan", "Winthrop"),
                Record::new("John", "Smith"),
            ])
        );
    }

    #[test]
    fn test_validation_empty_name() {
        let config = RosterConfig {
            records: Some(vec![Record::new("Ryan", "  ")]),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_empty_records_table() {
        let config = RosterConfig {
            records: Some(Vec::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = RosterConfig::load_from(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config, RosterConfig::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[timing\n").unwrap();
        assert!(matches!(
            RosterConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let config = RosterConfig {
            timing: TimingConfig {
                debounce_ms: 10,
                filter_latency_ms: 20,
                linger_ms: 30,
            },
            records: Some(vec![Record::new("Susan", "Roy")]),
        };
        config.save_to(&path).unwrap();
        assert_eq!(RosterConfig::load_from(&path).unwrap(), config);
    }
}
