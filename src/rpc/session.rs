//! Per-connection session.
//!
//! A session owns exactly one client connection from accept to close:
//!
//! 1. **Greeting**: send the welcome envelope
//! 2. **Receiving**: read, decode, dispatch and answer requests in order
//! 3. **Closed**: shut the connection down
//!
//! Responses go back on the connection that carried the request, in the
//! order the requests arrived. Sessions share nothing mutable with each
//! other; the request id is only echoed, never used to route a response.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::rpc::dispatch::Dispatcher;
use crate::rpc::protocol::Envelope;
use crate::rpc::transport::Connection;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, welcome message not yet sent.
    Greeting,
    /// Serving requests.
    Receiving,
    /// Connection released.
    Closed,
}

/// One client connection and its request loop.
#[derive(Debug)]
pub struct Session<S> {
    id: Uuid,
    state: SessionState,
    connection: Connection<S>,
    dispatcher: Dispatcher,
    greeting: Arc<str>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session for a freshly accepted stream.
    #[must_use]
    pub fn new(stream: S, dispatcher: Dispatcher, greeting: Arc<str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Greeting,
            connection: Connection::new(stream),
            dispatcher,
            greeting,
        }
    }

    /// Returns the identifier used in log output.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session until the peer disconnects or the connection fails.
    ///
    /// The connection is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that ended the session, if any. A clean
    /// disconnect by the peer is not an error.
    pub async fn run(&mut self) -> io::Result<()> {
        let span = info_span!("session", id = %self.id);
        async {
            let result = self.serve().await;
            self.close().await;
            result
        }
        .instrument(span)
        .await
    }

    async fn serve(&mut self) -> io::Result<()> {
        self.connection
            .write_envelope(&Envelope::greeting(&self.greeting))
            .await?;
        self.state = SessionState::Receiving;

        while let Some(lines) = self.connection.read_lines().await? {
            for line in lines {
                self.answer(&line).await?;
            }
        }

        if !self.connection.pending().is_empty() {
            debug!(
                bytes = self.connection.pending().len(),
                "Discarding unterminated request at EOF"
            );
        }

        Ok(())
    }

    async fn answer(&mut self, line: &[u8]) -> io::Result<()> {
        debug!(request = %String::from_utf8_lossy(line), "Received request");
        let envelope = self.dispatcher.dispatch(line);
        debug!(id = %envelope.id(), error = envelope.is_error(), "Sending response");

        self.connection.write_envelope(&envelope).await
    }

    async fn close(&mut self) {
        self.state = SessionState::Closed;
        if let Err(e) = self.connection.shutdown().await {
            debug!(error = %e, "Connection shutdown failed");
        }
        info!("Connection closed");
    }
}
