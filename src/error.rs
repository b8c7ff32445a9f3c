//! Error types for unix-rpc.
//!
//! Only startup and listener failures surface here. Everything that goes
//! wrong while serving a single request is reported to the client inside
//! the JSON envelope instead (see [`crate::rpc::methods::InvocationError`]).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while setting up or running the socket listener.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A leftover entry at the socket path could not be removed.
    #[error("failed to remove stale socket: {path}")]
    StaleSocket {
        /// The socket path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The socket could not be bound.
    #[error("failed to bind socket: {path}")]
    Bind {
        /// The socket path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The listener can no longer accept connections.
    #[error("listener failed to accept connections")]
    Accept {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Shutdown signal handlers could not be installed.
    #[error("failed to install signal handler")]
    Signal {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
