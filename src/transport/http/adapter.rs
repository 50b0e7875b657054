//! Protocol adapter for `POST /mcp`.
//!
//! Turns an axum request into an [`AdaptedRequest`] plus a buffered response
//! sink, runs it through the session's protocol transport, and passes the
//! buffered status, headers and body back out unchanged.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use http::header::{HeaderValue, ACCEPT};
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::AdapterError;
use crate::mcp::transport::{
    AdaptedRequest, ResponseSink, ALT_SESSION_ID_HEADER, SESSION_ID_HEADER,
};
use crate::transport::http::{internal_error_response, HttpState};

/// Largest request body accepted.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Query parameter carrying the session id.
const SESSION_ID_PARAM: &str = "sessionId";

/// Accept value substituted for event-stream-only clients.
const JSON_OR_EVENT_STREAM: &str = "application/json, text/event-stream";

/// A response assembled in memory.
#[derive(Debug)]
pub struct CompletedResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full body.
    pub body: Bytes,
}

/// A [`ResponseSink`] that buffers everything until `end`.
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    done: oneshot::Sender<CompletedResponse>,
}

/// Resolves once the matching [`BufferedResponse`] has ended.
pub struct ResponseHandle(oneshot::Receiver<CompletedResponse>);

impl BufferedResponse {
    /// Creates an empty 200 response and its completion handle.
    #[must_use]
    pub fn new() -> (Self, ResponseHandle) {
        let (done, rx) = oneshot::channel();
        let response = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            done,
        };
        (response, ResponseHandle(rx))
    }
}

impl ResponseSink for BufferedResponse {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        self.status = status;
        self.headers = headers;
    }

    fn write(&mut self, chunk: Bytes) -> bool {
        self.body.extend_from_slice(&chunk);
        true
    }

    fn end(mut self, chunk: Option<Bytes>) {
        if let Some(chunk) = chunk {
            self.body.extend_from_slice(&chunk);
        }
        // The handle may already be gone; nothing to deliver then.
        let _ = self.done.send(CompletedResponse {
            status: self.status,
            headers: self.headers,
            body: self.body.freeze(),
        });
    }
}

impl ResponseHandle {
    /// Waits for the response to end.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::ResponseDropped`] if the sink was dropped
    /// without being ended.
    pub async fn completed(self) -> Result<CompletedResponse, AdapterError> {
        self.0.await.map_err(|_| AdapterError::ResponseDropped)
    }
}

/// Handles `POST /mcp`.
pub async fn handle_post(State(state): State<HttpState>, request: Request) -> Response {
    match adapt(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Error handling MCP request");
            internal_error_response()
        }
    }
}

async fn adapt(state: &HttpState, request: Request) -> Result<Response, AdapterError> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(AdapterError::Body)?;
    let payload: Value = serde_json::from_slice(&bytes)?;

    let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|e| AdapterError::InvalidQuery(e.to_string()))?;

    let mut headers = parts.headers;
    relax_accept(&mut headers);

    let session_id = resolve_session_id(&query, &headers);
    if let Some(ref id) = session_id {
        headers.insert(SESSION_ID_HEADER, HeaderValue::from_str(id)?);
    }

    let session = state
        .registry
        .get_or_create(session_id.as_deref(), &state.server);
    debug!(session_id = session.id(), "Dispatching MCP request");

    let adapted = AdaptedRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query,
        headers,
    };

    let (response, handle) = BufferedResponse::new();
    session
        .transport()
        .handle_request(&adapted, response, payload)
        .await;
    let completed = handle.completed().await?;

    let mut builder = Response::builder().status(completed.status);
    if let Some(headers) = builder.headers_mut() {
        headers.extend(completed.headers);
    }
    Ok(builder.body(Body::from(completed.body))?)
}

/// Picks the session id: query parameter, then `mcp-session-id`, then
/// `x-mcp-session-id`. Blank values count as absent.
fn resolve_session_id(query: &HashMap<String, String>, headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    query
        .get(SESSION_ID_PARAM)
        .cloned()
        .into_iter()
        .chain(header(SESSION_ID_HEADER))
        .chain(header(ALT_SESSION_ID_HEADER))
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
}

/// Widens an event-stream-only Accept header to also admit JSON.
fn relax_accept(headers: &mut HeaderMap) {
    let event_stream_only = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| {
            let accept = accept.to_ascii_lowercase();
            accept.contains("text/event-stream") && !accept.contains("application/json")
        });

    if event_stream_only {
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_OR_EVENT_STREAM));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn session_id_precedence() {
        let mut query = HashMap::new();
        let both = headers(&[(SESSION_ID_HEADER, "from-header"), (ALT_SESSION_ID_HEADER, "alt")]);

        assert_eq!(resolve_session_id(&query, &both).as_deref(), Some("from-header"));

        query.insert(SESSION_ID_PARAM.to_string(), "from-query".to_string());
        assert_eq!(resolve_session_id(&query, &both).as_deref(), Some("from-query"));

        let alt_only = headers(&[(ALT_SESSION_ID_HEADER, "alt")]);
        assert_eq!(
            resolve_session_id(&HashMap::new(), &alt_only).as_deref(),
            Some("alt")
        );
    }

    #[test]
    fn blank_session_ids_are_ignored() {
        let mut query = HashMap::new();
        query.insert(SESSION_ID_PARAM.to_string(), "  ".to_string());
        let map = headers(&[(SESSION_ID_HEADER, ""), (ALT_SESSION_ID_HEADER, "alt")]);

        assert_eq!(resolve_session_id(&query, &map).as_deref(), Some("alt"));
        assert!(resolve_session_id(&HashMap::new(), &HeaderMap::new()).is_none());
    }

    #[test]
    fn accept_is_relaxed_for_event_stream_clients() {
        let mut map = headers(&[("accept", "text/event-stream")]);
        relax_accept(&mut map);
        assert_eq!(map[ACCEPT], JSON_OR_EVENT_STREAM);

        let mut map = headers(&[("accept", "application/json")]);
        relax_accept(&mut map);
        assert_eq!(map[ACCEPT], "application/json");
    }

    #[tokio::test]
    async fn buffered_response_completes_on_end() {
        let (mut response, handle) = BufferedResponse::new();
        response.write_head(StatusCode::ACCEPTED, HeaderMap::new());
        assert!(response.write(Bytes::from_static(b"ab")));
        response.end(Some(Bytes::from_static(b"c")));

        let completed = handle.completed().await.unwrap();
        assert_eq!(completed.status, StatusCode::ACCEPTED);
        assert_eq!(completed.body, Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn dropped_response_is_an_error() {
        let (response, handle) = BufferedResponse::new();
        drop(response);
        assert!(matches!(
            handle.completed().await,
            Err(AdapterError::ResponseDropped)
        ));
    }
}
