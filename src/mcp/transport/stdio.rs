//! stdio transport for MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Exactly one session exists for the lifetime of the stream.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::mcp::protocol::{parse_message, JsonRpcError};
use crate::mcp::server::{McpServer, SessionState};
use crate::mcp::transport::ProtocolTransport;
use crate::transport::shutdown_signal;

/// A stream-based MCP transport, by default over stdin and stdout.
pub struct StdioServerTransport<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    /// Buffered reader for incoming lines.
    reader: Mutex<BufReader<R>>,
    /// Sink for outgoing lines.
    writer: Mutex<W>,
    /// Lifecycle state of the single implicit session.
    session: SessionState,
}

impl StdioServerTransport {
    /// Creates a transport over the process's standard streams.
    #[must_use]
    pub fn new() -> Self {
        Self::with_streams(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioServerTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioServerTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a transport over arbitrary byte streams.
    pub fn with_streams(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            session: SessionState::new(),
        }
    }

    /// Returns the session state of this transport.
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// Consumes the transport and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// Serves messages until the input stream reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is already serving or an I/O
    /// operation fails.
    pub async fn serve(&self, server: &McpServer) -> Result<(), TransportError> {
        let mut reader = self
            .reader
            .try_lock()
            .map_err(|_| TransportError::AlreadyConnected)?;

        loop {
            let Some(bytes) = read_line(&mut reader).await? else {
                debug!("Input stream closed");
                self.session.shut_down();
                return Ok(());
            };

            let Ok(line) = String::from_utf8(bytes) else {
                warn!("Rejecting line that is not valid UTF-8");
                self.write_message(&JsonRpcError::parse_error()).await?;
                continue;
            };

            if line.trim().is_empty() {
                continue;
            }

            self.handle_line(server, &line).await?;
        }
    }

    /// Handles one line of input.
    async fn handle_line(&self, server: &McpServer, line: &str) -> Result<(), TransportError> {
        match parse_message(line) {
            Ok(msg) => {
                if let Some(reply) = server.handle_message(&self.session, msg).await {
                    self.write_message(&reply).await?;
                }
            }
            Err(error) => {
                warn!(code = error.error.code, "Rejecting malformed message");
                self.write_message(&error).await?;
            }
        }
        Ok(())
    }

    /// Writes one message terminated with a newline.
    async fn write_message<T: Serialize + Sync>(&self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl<R, W> ProtocolTransport for StdioServerTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn session_id(&self) -> Option<&str> {
        None
    }

    async fn start(&self, server: Arc<McpServer>) -> Result<(), TransportError> {
        tokio::select! {
            result = self.serve(&server) => result,
            () = shutdown_signal() => {
                info!("Shutdown signal received, closing stdio session");
                self.session.shut_down();
                Ok(())
            }
        }
    }
}

/// Reads the next line as raw bytes, without its terminator.
///
/// Returns `None` at EOF. Decoding is left to the caller so that a line
/// which is not UTF-8 can be answered instead of ending the session.
async fn read_line<R>(reader: &mut BufReader<R>) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let bytes_read = reader.read_until(b'\n', &mut line).await?;

    if bytes_read == 0 {
        return Ok(None);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }

    Ok(Some(line))
}
