//! Legacy event-stream transport.
//!
//! On start the transport opens the stream and announces the endpoint the
//! client should POST its messages to.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
    CONNECTION, CONTENT_TYPE,
};
use http::{HeaderMap, StatusCode};

use crate::error::TransportError;
use crate::mcp::server::McpServer;
use crate::mcp::transport::{ProtocolTransport, ResponseSink};

/// Event-stream MCP transport for one session.
pub struct SseServerTransport {
    session_id: String,
    endpoint: String,
    sink: Mutex<Box<dyn ResponseSink>>,
    started: Mutex<bool>,
}

impl SseServerTransport {
    /// Creates a transport that streams to `sink` and advertises
    /// `/mcp?sessionId=<session_id>` as its message endpoint.
    #[must_use]
    pub fn new(session_id: impl Into<String>, sink: Box<dyn ResponseSink>) -> Self {
        let session_id = session_id.into();
        Self {
            endpoint: format!("/mcp?sessionId={session_id}"),
            session_id,
            sink: Mutex::new(sink),
            started: Mutex::new(false),
        }
    }

    /// Returns the endpoint announced to the client.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Writes one event to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the client has gone away.
    pub fn send_event(&self, event: &str, data: &str) -> Result<(), TransportError> {
        let frame = format!("event: {event}\ndata: {data}\n\n");
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if sink.write(Bytes::from(frame)) {
            Ok(())
        } else {
            Err(TransportError::StreamClosed)
        }
    }
}

#[async_trait]
impl ProtocolTransport for SseServerTransport {
    fn session_id(&self) -> Option<&str> {
        Some(&self.session_id)
    }

    async fn start(&self, _server: Arc<McpServer>) -> Result<(), TransportError> {
        {
            let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
            if *started {
                return Err(TransportError::AlreadyConnected);
            }
            *started = true;
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Last-Event-ID, Mcp-Session-Id"),
        );

        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_head(StatusCode::OK, headers);

        self.send_event("endpoint", &self.endpoint)
    }
}
