//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given on the command line
//! 2. `config.json` in the current working directory
//! 3. Default location: `~/.unix-rpc/config.json`
//!
//! # Example Configuration
//!
//! ```json
//! { "filepath": "/tmp/unix-rpc.sock" }
//! ```

mod settings;

pub use settings::{Config, LoggingConfig, MAX_SOCKET_PATH_LEN};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the default configuration directory (`~/.unix-rpc/`).
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".unix-rpc"))
}

/// Returns the per-user default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Picks the configuration file to load when none is given explicitly.
///
/// Prefers `config.json` in the working directory, falling back to the
/// per-user default.
#[must_use]
pub fn resolve_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    default_config_path()
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses [`resolve_config_path`].
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Required fields are missing or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => resolve_config_path().ok_or_else(|| ConfigError::NotFound {
            path: PathBuf::from(CONFIG_FILE_NAME),
        })?,
    };

    if !config_path.exists() {
        return Err(ConfigError::NotFound { path: config_path });
    }

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
