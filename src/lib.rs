//! unix-rpc: a line-delimited JSON RPC server over a Unix domain socket
//!
//! Clients connect to a socket path named in the configuration file, receive
//! a greeting, then send one JSON request per line and get one JSON response
//! per line back.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`rpc`]: Framing, dispatch, sessions and the socket listener

pub mod config;
pub mod error;
pub mod rpc;
