//! Protocol transports.
//!
//! A protocol transport carries JSON-RPC messages between one client and the
//! shared [`McpServer`]. Three substrates are provided:
//!
//! - [`stdio`]: newline-delimited JSON over the process's standard streams
//! - [`streamable`]: one HTTP request, one whole JSON response
//! - [`sse`]: a long-lived event stream announcing its POST endpoint
//!
//! The HTTP-facing transports do not speak to a web framework directly. They
//! consume an [`AdaptedRequest`] and write to a [`ResponseSink`], the minimal
//! request/response surface the HTTP layer builds for them.

pub mod sse;
pub mod stdio;
pub mod streamable;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::TransportError;
use crate::mcp::server::McpServer;

pub use sse::SseServerTransport;
pub use stdio::StdioServerTransport;
pub use streamable::StreamableHttpTransport;

/// Header carrying the session identifier.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Alternate session identifier header accepted from clients.
pub const ALT_SESSION_ID_HEADER: &str = "x-mcp-session-id";

/// A transport that binds one client conversation to an [`McpServer`].
#[async_trait]
pub trait ProtocolTransport: Send + Sync {
    /// The session identifier this transport reports, if it has one.
    fn session_id(&self) -> Option<&str>;

    /// Starts carrying traffic for `server`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is already bound or its underlying
    /// channel fails.
    async fn start(&self, server: Arc<McpServer>) -> Result<(), TransportError>;
}

/// The write side of an HTTP exchange, as seen by a protocol transport.
pub trait ResponseSink: Send {
    /// Sets the status code and replaces the headers.
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap);

    /// Appends a body chunk. Returns `false` if the peer is gone.
    fn write(&mut self, chunk: Bytes) -> bool;

    /// Finishes the response, optionally with a final chunk.
    fn end(self, chunk: Option<Bytes>)
    where
        Self: Sized;
}

/// An HTTP request reduced to what a protocol transport inspects.
#[derive(Debug, Clone)]
pub struct AdaptedRequest {
    /// Request method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Request headers after normalisation.
    pub headers: HeaderMap,
}

impl AdaptedRequest {
    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
