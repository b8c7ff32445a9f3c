//! unix-rpc: line-delimited JSON RPC server over a Unix domain socket
//!
//! Binds the socket path named in the configuration file and serves the
//! standard method table until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use unix_rpc::config;
use unix_rpc::rpc::RpcServer;

/// Line-delimited JSON RPC server over a Unix domain socket.
///
/// Reads the socket path from a JSON configuration file
/// (`{"filepath": "/tmp/unix-rpc.sock"}`).
#[derive(Parser, Debug)]
#[command(name = "unix-rpc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ./config.json, then ~/.unix-rpc/config.json)
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the unix-rpc server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!(
                        "\nExpected config at: ./{} or {}",
                        config::CONFIG_FILE_NAME,
                        default_path.display()
                    );
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        socket = %cfg.filepath.display(),
        "Starting unix-rpc server"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    // Binding registers the listener with the runtime's reactor.
    let _guard = runtime.enter();
    let result = RpcServer::from_config(&cfg).and_then(|server| runtime.block_on(server.run()));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            match std::error::Error::source(&e) {
                Some(cause) => error!(error = %e, cause = %cause, "Server error"),
                None => error!(error = %e, "Server error"),
            }
            ExitCode::FAILURE
        }
    }
}
