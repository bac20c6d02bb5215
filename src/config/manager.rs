//! Configuration manager for loading and saving application configuration
//!
//! This module provides functionality to load and save configuration to
//! %APPDATA%\ParsecVDisplay\config.json with atomic writes to prevent corruption.

use crate::config::models::AppConfig;
use crate::error::{Result, StringError, VdisplayError};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Application data folder name under %APPDATA%
pub const APP_DIR_NAME: &str = "ParsecVDisplay";

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the application data directory
    ///
    /// Returns: %APPDATA%\ParsecVDisplay (falls back to the working directory when
    /// APPDATA is unset, e.g. on non-Windows development machines)
    pub fn get_app_dir() -> PathBuf {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME)
    }

    /// Get the path to the configuration file
    ///
    /// Returns: %APPDATA%\ParsecVDisplay\config.json
    pub fn get_config_path() -> PathBuf {
        Self::get_app_dir().join("config.json")
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::get_app_dir();
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist or is corrupt, returns default configuration.
    pub fn load() -> Result<AppConfig> {
        let config_path = Self::get_config_path();

        if !config_path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(&config_path)?;

        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Save configuration to disk with atomic write
    ///
    /// Writes to a temporary file in the same directory, then persists it over
    /// config.json so readers never observe a partially written file.
    pub fn save(config: &AppConfig) -> Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = Self::get_config_path();

        let json = serde_json::to_string_pretty(config)?;

        let mut temp = tempfile::NamedTempFile::new_in(&config_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&config_path).map_err(|e| {
            warn!("Failed to persist configuration: {}", e);
            VdisplayError::ConfigError(Box::new(e))
        })?;

        debug!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    /// Validate a configuration file without loading it into the application
    pub fn validate(json: &str) -> Result<AppConfig> {
        let config: AppConfig = serde_json::from_str(json)?;
        if !crate::locale::is_supported(&config.language) {
            return Err(VdisplayError::ConfigError(StringError::new(format!(
                "Unsupported language: {}",
                config.language
            ))));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{AppdataGuard, create_test_dir};

    #[test]
    fn test_config_path() {
        let path = ConfigManager::get_config_path();
        assert!(path.to_string_lossy().contains("ParsecVDisplay"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        let config = ConfigManager::load().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        let config = AppConfig {
            language: "简体中文".to_string(),
            fallback_display: true,
            ..AppConfig::default()
        };
        ConfigManager::save(&config).unwrap();

        let loaded = ConfigManager::load().unwrap();
        assert_eq!(loaded, config);

        // No stray temp files left behind
        let entries: Vec<_> = std::fs::read_dir(ConfigManager::get_app_dir())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_corrupt_config_uses_defaults() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        ConfigManager::ensure_config_dir().unwrap();
        std::fs::write(ConfigManager::get_config_path(), "{ not json").unwrap();

        let config = ConfigManager::load().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let result = ConfigManager::validate(r#"{"language": "Klingon"}"#);
        assert!(matches!(result, Err(VdisplayError::ConfigError(_))));

        let result = ConfigManager::validate(r#"{"language": "English"}"#);
        assert!(result.is_ok());
    }
}
