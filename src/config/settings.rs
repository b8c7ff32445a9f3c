//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Longest socket path the kernel accepts (`sun_path` is 108 bytes including NUL).
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Filesystem path of the Unix domain socket to bind.
    pub filepath: PathBuf,

    /// Welcome text sent to every client on connect.
    #[serde(default)]
    pub greeting: Option<String>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Creates a configuration for the given socket path with defaults elsewhere.
    #[must_use]
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            _schema: None,
            _comment: None,
            filepath: filepath.into(),
            greeting: None,
            logging: LoggingConfig::default(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filepath.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "filepath must not be empty".to_string(),
            });
        }

        let path_len = self.filepath.as_os_str().len();
        if path_len > MAX_SOCKET_PATH_LEN {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "filepath is {path_len} bytes long, socket paths are limited to {MAX_SOCKET_PATH_LEN}"
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r#"{"filepath": "/tmp/rpc.sock"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.filepath, PathBuf::from("/tmp/rpc.sock"));
        assert!(config.greeting.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "filepath": "/run/user/1000/rpc.sock",
            "greeting": "ようこそ",
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.filepath, PathBuf::from("/run/user/1000/rpc.sock"));
        assert_eq!(config.greeting.as_deref(), Some("ようこそ"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn reject_missing_filepath() {
        let result: Result<Config, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn reject_empty_filepath() {
        let config = Config::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_overlong_filepath() {
        let long = format!("/tmp/{}.sock", "a".repeat(MAX_SOCKET_PATH_LEN));
        let config = Config::new(long);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("limited to"));
    }

    #[test]
    fn reject_invalid_log_level() {
        let json = r#"{"filepath": "/tmp/rpc.sock", "logging": {"level": "loud"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "filepath": "/tmp/rpc.sock",
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
