//! Unix domain socket listener.
//!
//! The listener binds the configured path, accepts connections in a loop and
//! hands each one to its own [`Session`] task. It keeps no handle to spawned
//! sessions, so a slow or stuck client never blocks the accept loop and no
//! registry of connections exists.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::rpc::dispatch::Dispatcher;
use crate::rpc::protocol::DEFAULT_GREETING;
use crate::rpc::session::Session;

/// Pause after a transient accept failure before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// A bound listener ready to serve clients.
#[derive(Debug)]
pub struct RpcServer {
    path: PathBuf,
    listener: UnixListener,
    dispatcher: Dispatcher,
    greeting: Arc<str>,
}

impl RpcServer {
    /// Binds a listener at `path`, replacing any stale entry there.
    ///
    /// Uses the standard method table and the default greeting. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a leftover entry cannot be removed or the socket
    /// cannot be bound.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref().to_path_buf();

        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path).map_err(|source| ServerError::Bind {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            listener,
            dispatcher: Dispatcher::default(),
            greeting: Arc::from(DEFAULT_GREETING),
        })
    }

    /// Binds the socket named by a configuration, applying its greeting.
    ///
    /// # Errors
    ///
    /// See [`RpcServer::bind`].
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let server = Self::bind(&config.filepath)?;
        Ok(match &config.greeting {
            Some(greeting) => server.with_greeting(greeting.as_str()),
            None => server,
        })
    }

    /// Replaces the welcome text.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<Arc<str>>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Returns the socket path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be installed or the
    /// listener fails fatally.
    pub async fn run(self) -> Result<(), ServerError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|source| ServerError::Signal { source })?;
        let mut sigterm =
            signal(SignalKind::terminate()).map_err(|source| ServerError::Signal { source })?;

        self.serve_until(async move {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
            }
        })
        .await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Transient accept errors are logged and retried after a short pause.
    /// The socket file is removed when the loop ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener can no longer accept connections.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(path = %self.path.display(), "Listening for connections");

        let mut last_error = None::<io::ErrorKind>;
        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        last_error = None;
                        self.spawn_session(stream);
                    }
                    Err(e) if is_fatal_accept_error(&e) => {
                        error!(error = %e, "Listener failed");
                        break Err(ServerError::Accept { source: e });
                    }
                    Err(e) => {
                        let kind = e.kind();
                        if last_error != Some(kind) {
                            warn!(error = %e, "Failed to accept connection");
                        }
                        last_error = Some(kind);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        };

        self.remove_socket_file();
        result
    }

    fn spawn_session(&self, stream: UnixStream) {
        let mut session = Session::new(stream, self.dispatcher.clone(), Arc::clone(&self.greeting));
        info!(session = %session.id(), "Accepted connection");

        tokio::spawn(async move {
            if let Err(e) = session.run().await {
                warn!(session = %session.id(), error = %e, "Session ended with I/O error");
            }
        });
    }

    fn remove_socket_file(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

/// Binds `path` and serves until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if binding fails or the listener fails fatally.
pub async fn serve(path: impl AsRef<Path>) -> Result<(), ServerError> {
    RpcServer::bind(path)?.run().await
}

/// Removes a leftover filesystem entry from a previous run.
fn remove_stale_socket(path: &Path) -> Result<(), ServerError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale socket");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ServerError::StaleSocket {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Errors after which the listener cannot accept anything again.
///
/// Everything else (aborted handshakes, descriptor exhaustion, interrupts)
/// is treated as transient.
fn is_fatal_accept_error(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::InvalidInput)
}
