//! Application configuration
//!
//! Loaded from `config.toml` in the platform data directory unless a path
//! is given. A missing file yields defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chart::DEFAULT_CHART_WINDOW;
use crate::error::BmiError;
use crate::history::DEFAULT_STORAGE_KEY;
use crate::types::UnitSystem;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the history file. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Key the history is stored under
    pub storage_key: String,
    /// Unit system used for display when none is given
    pub unit_system: UnitSystem,
    /// Number of entries plotted in the trend chart
    pub chart_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            unit_system: UnitSystem::Metric,
            chart_window: DEFAULT_CHART_WINDOW,
        }
    }
}

impl Config {
    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn from_toml(content: &str) -> Result<Self, BmiError> {
        let config: Config =
            toml::from_str(content).map_err(|e| BmiError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, BmiError> {
        toml::to_string_pretty(self).map_err(|e| BmiError::ConfigError(e.to_string()))
    }

    fn validate(&self) -> Result<(), BmiError> {
        if self.storage_key.trim().is_empty() {
            return Err(BmiError::ConfigError("storage_key must not be empty".to_string()));
        }
        if self.chart_window == 0 {
            return Err(BmiError::ConfigError("chart_window must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Platform data directory for the tracker
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("ai", "synheart", "bmi-tracker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Load configuration from `path`, or from the default location
pub fn load_config(path: Option<&Path>) -> Result<Config, BmiError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| BmiError::ConfigError(format!("{}: {}", path.display(), e)))?;
    Config::from_toml(&content)
}

/// Write configuration to `path`, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), BmiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BmiError::ConfigError(e.to_string()))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| BmiError::ConfigError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml("unit_system = \"imperial\"\n").unwrap();

        assert_eq!(config.unit_system, UnitSystem::Imperial);
        assert_eq!(config.storage_key, "bmi-history");
        assert_eq!(config.chart_window, 10);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml("chart_window = 0").is_err());
        assert!(Config::from_toml("storage_key = \"  \"").is_err());
        assert!(Config::from_toml("unit_system = \"furlongs\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = Config {
            data_dir: Some(dir.path().join("data")),
            chart_window: 5,
            ..Default::default()
        };

        save_config(&config, &path).unwrap();
        let loaded = load_config(Some(path.as_path())).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.data_dir(), dir.path().join("data"));
    }
}
