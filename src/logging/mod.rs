//! # Logging System
//!
//! Installs an `env_logger` backend behind the `log` facade, with the global
//! level and per-feature levels taken from [`LogConfig`].

pub mod config;
pub mod features;

pub use config::LogConfig;
pub use features::LogFeature;

use once_cell::sync::OnceCell;
use std::io::Write;

/// Global logging configuration instance
static LOGGING_CONFIG: OnceCell<LogConfig> = OnceCell::new();

/// Process-wide logging setup
pub struct LoggingSystem;

impl LoggingSystem {
    /// Initialize the logging system with default configuration
    pub fn init_default() -> Result<(), LoggingError> {
        let mut config = LogConfig::default();
        config.apply_env_overrides();
        Self::init_with_config(config)
    }

    /// Initialize the logging system with a custom configuration
    pub fn init_with_config(config: LogConfig) -> Result<(), LoggingError> {
        config.validate()?;

        let mut builder = env_logger::Builder::new();
        builder.filter_level(config::parse_level(&config.general.default_level)?);

        for (name, level) in &config.features {
            let filter = config::parse_level(level)?;
            match LogFeature::from_name(name) {
                Some(feature) => {
                    builder.filter_module(feature.target(), filter);
                }
                None => {
                    // Unknown features still work as raw module targets
                    builder.filter_module(name, filter);
                }
            }
        }

        builder.write_style(if config.general.enable_colors {
            env_logger::WriteStyle::Auto
        } else {
            env_logger::WriteStyle::Never
        });

        let include_timestamp = config.console.include_timestamp;
        let include_module = config.console.include_module;
        builder.format(move |buf, record| {
            if include_timestamp {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }
            write!(buf, "{:<5} ", record.level())?;
            if include_module {
                write!(buf, "[{}] ", record.target())?;
            }
            writeln!(buf, "{}", record.args())
        });

        LOGGING_CONFIG
            .set(config)
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        builder
            .try_init()
            .map_err(|e| LoggingError::Backend(e.to_string()))?;

        Ok(())
    }

    /// Get the global logging configuration
    pub fn get_config() -> Option<&'static LogConfig> {
        LOGGING_CONFIG.get()
    }

    pub fn is_initialized() -> bool {
        LOGGING_CONFIG.get().is_some()
    }
}

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
    #[error("Logger backend error: {0}")]
    Backend(String),
    #[error("Config error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_invalid_level_before_installing() {
        let mut config = LogConfig::default();
        config.general.default_level = "CHATTY".to_string();
        assert!(matches!(
            LoggingSystem::init_with_config(config),
            Err(LoggingError::ConfigError(_))
        ));
        assert!(!LoggingSystem::is_initialized());
    }
}
