//! Configuration management for the logging system
//!
//! Logging configuration is read from the `[logging]` table of the partysync
//! configuration file and can be overridden through environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const VALID_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Main logging configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// General logging settings
    pub general: GeneralConfig,
    /// Console output configuration
    pub console: ConsoleConfig,
    /// Feature-specific log levels
    pub features: HashMap<String, String>,
}

/// General logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default log level for all modules
    pub default_level: String,
    /// Enable colored output
    pub enable_colors: bool,
}

/// Console output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Include timestamps
    pub include_timestamp: bool,
    /// Include module path
    pub include_module: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            console: ConsoleConfig::default(),
            features: Self::default_features(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_level: "INFO".to_string(),
            enable_colors: true,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            include_module: true,
        }
    }
}

impl LogConfig {
    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("PARTYSYNC_LOG_LEVEL") {
            self.general.default_level = level.to_uppercase();
        }
        if let Ok(colors) = std::env::var("PARTYSYNC_LOG_COLORS") {
            self.general.enable_colors = colors.parse().unwrap_or(true);
        }

        for (key, value) in std::env::vars() {
            if let Some(feature) = key.strip_prefix("PARTYSYNC_LOG_FEATURE_") {
                self.features
                    .insert(feature.to_lowercase(), value.to_uppercase());
            }
        }
    }

    /// Get default feature-specific log levels
    fn default_features() -> HashMap<String, String> {
        let mut features = HashMap::new();
        features.insert("sync".to_string(), "INFO".to_string());
        features.insert("mutation".to_string(), "INFO".to_string());
        features.insert("status".to_string(), "INFO".to_string());
        features.insert("store".to_string(), "WARN".to_string());
        features.insert("session".to_string(), "INFO".to_string());
        features.insert("users".to_string(), "INFO".to_string());
        features
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LEVELS.contains(&self.general.default_level.as_str()) {
            return Err(ConfigError::InvalidLevel(
                self.general.default_level.clone(),
            ));
        }

        for (feature, level) in &self.features {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidFeatureLevel {
                    feature: feature.clone(),
                    level: level.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Parse a configured level name
pub fn parse_level(level: &str) -> Result<log::LevelFilter, ConfigError> {
    match level {
        "TRACE" => Ok(log::LevelFilter::Trace),
        "DEBUG" => Ok(log::LevelFilter::Debug),
        "INFO" => Ok(log::LevelFilter::Info),
        "WARN" => Ok(log::LevelFilter::Warn),
        "ERROR" => Ok(log::LevelFilter::Error),
        other => Err(ConfigError::InvalidLevel(other.to_string())),
    }
}

/// Logging configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
    #[error("Invalid log level '{level}' for feature '{feature}'")]
    InvalidFeatureLevel { feature: String, level: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.get("sync"), Some(&"INFO".to_string()));
    }

    #[test]
    fn test_invalid_feature_level_is_rejected() {
        let mut config = LogConfig::default();
        config
            .features
            .insert("sync".to_string(), "LOUD".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFeatureLevel { .. })
        ));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG").unwrap(), log::LevelFilter::Debug);
        assert!(parse_level("verbose").is_err());
    }
}
