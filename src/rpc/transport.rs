//! Byte-stream transport for one client connection.
//!
//! - Messages are UTF-8 encoded JSON objects
//! - Messages are delimited by newlines
//! - Outgoing messages never contain embedded newlines
//! - Incoming bytes are read in chunks of [`READ_CHUNK_SIZE`] and reassembled
//!   into lines by a [`LineDecoder`]
//!
//! The transport is generic over the stream so sessions can run on a
//! `UnixStream` in production and on in-memory pipes in tests.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::rpc::codec::LineDecoder;
use crate::rpc::protocol::Envelope;

/// Maximum number of bytes requested from the socket per read.
pub const READ_CHUNK_SIZE: usize = 4096;

/// A framed, bidirectional client connection.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    decoder: LineDecoder,
    chunk: Vec<u8>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: LineDecoder::new(),
            chunk: vec![0; READ_CHUNK_SIZE],
        }
    }

    /// Performs one read and returns the lines it completed.
    ///
    /// Returns `None` once the peer has closed its end (a zero-byte read).
    /// The returned list is empty when the read ended mid-line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the stream fails.
    pub async fn read_lines(&mut self) -> io::Result<Option<Vec<Vec<u8>>>> {
        let bytes_read = self.stream.read(&mut self.chunk).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        Ok(Some(self.decoder.decode(&self.chunk[..bytes_read])))
    }

    /// Writes an envelope as one newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_envelope(&mut self, envelope: &Envelope) -> io::Result<()> {
        let line = envelope
            .to_line()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        debug_assert!(
            !line[..line.len() - 1].contains(&b'\n'),
            "JSON message must not contain embedded newlines"
        );

        self.stream.write_all(&line).await?;
        self.stream.flush().await
    }

    /// Shuts down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    /// Bytes received after the last complete line.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        self.decoder.pending()
    }
}
