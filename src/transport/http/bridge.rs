//! Streaming bridge for `GET /sse`.
//!
//! Each connection gets a fresh session id and an event-stream protocol
//! transport whose writes are forwarded, unbuffered, to the HTTP body.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use futures::stream;
use http::{HeaderMap, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::AdapterError;
use crate::mcp::server::McpServer;
use crate::mcp::transport::{ResponseSink, SseServerTransport};
use crate::transport::http::{internal_error_response, HttpState};

/// A [`ResponseSink`] that forwards every chunk to a channel.
pub struct StreamingResponse {
    head: Option<oneshot::Sender<(StatusCode, HeaderMap)>>,
    chunks: mpsc::UnboundedSender<Bytes>,
}

impl StreamingResponse {
    /// Creates a sink plus the receiving ends for its head and body.
    #[must_use]
    pub fn channel() -> (
        Self,
        oneshot::Receiver<(StatusCode, HeaderMap)>,
        mpsc::UnboundedReceiver<Bytes>,
    ) {
        let (head_tx, head_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let sink = Self {
            head: Some(head_tx),
            chunks: chunk_tx,
        };
        (sink, head_rx, chunk_rx)
    }
}

impl ResponseSink for StreamingResponse {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        if let Some(head) = self.head.take() {
            let _ = head.send((status, headers));
        }
    }

    fn write(&mut self, chunk: Bytes) -> bool {
        self.chunks.send(chunk).is_ok()
    }

    fn end(mut self, chunk: Option<Bytes>) {
        if let Some(chunk) = chunk {
            self.write(chunk);
        }
    }
}

/// Handles `GET /sse`.
pub async fn handle_sse(State(state): State<HttpState>) -> Response {
    match open_stream(&state.server).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Error opening event stream");
            internal_error_response()
        }
    }
}

async fn open_stream(server: &Arc<McpServer>) -> Result<Response, AdapterError> {
    let session_id = Uuid::new_v4().to_string();
    let (sink, head, chunks) = StreamingResponse::channel();
    let transport = Arc::new(SseServerTransport::new(session_id.clone(), Box::new(sink)));

    server.connect(transport.as_ref()).await?;
    let (status, headers) = head.await.map_err(|_| AdapterError::ResponseDropped)?;
    info!(session_id = %session_id, endpoint = transport.endpoint(), "Event stream opened");

    // The stream owns the transport, so it lives as long as the connection
    // does. Server shutdown ends it.
    let server = Arc::clone(server);
    let body = stream::unfold(
        (chunks, transport, server),
        |(mut chunks, transport, server)| async move {
            let chunk = tokio::select! {
                biased;
                chunk = chunks.recv() => chunk?,
                () = server.closed() => {
                    debug!(endpoint = transport.endpoint(), "Closing event stream on shutdown");
                    return None;
                }
            };
            Some((Ok::<_, Infallible>(chunk), (chunks, transport, server)))
        },
    );

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
