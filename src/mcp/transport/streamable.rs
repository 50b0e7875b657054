//! Streamable HTTP transport answering each POST with a whole JSON body.
//!
//! One instance serves one session. The session id is fixed at construction
//! and every request after `initialize` must carry it in the
//! `mcp-session-id` header.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::error::TransportError;
use crate::mcp::protocol::{
    parse_value, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
};
use crate::mcp::server::{McpServer, SessionState};
use crate::mcp::transport::{AdaptedRequest, ProtocolTransport, ResponseSink, SESSION_ID_HEADER};

#[derive(Clone)]
enum BindState {
    Pending,
    Bound(Arc<McpServer>),
    Failed,
}

/// Request/response MCP transport for one HTTP session.
pub struct StreamableHttpTransport {
    session_id: String,
    session_header: Option<HeaderValue>,
    session: SessionState,
    bind: watch::Sender<BindState>,
}

impl StreamableHttpTransport {
    /// Creates an unbound transport reporting `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let (bind, _) = watch::channel(BindState::Pending);
        Self {
            session_header: HeaderValue::from_str(&session_id).ok(),
            session_id,
            session: SessionState::new(),
            bind,
        }
    }

    /// Returns the lifecycle state of this session.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// Marks a pending bind as failed, releasing any waiting requests.
    pub fn mark_failed(&self) {
        self.bind.send_if_modified(|state| {
            if matches!(state, BindState::Pending) {
                *state = BindState::Failed;
                true
            } else {
                false
            }
        });
    }

    /// Returns `true` once the transport is bound to a server.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(*self.bind.borrow(), BindState::Bound(_))
    }

    /// Returns `true` if binding failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(*self.bind.borrow(), BindState::Failed)
    }

    /// Handles one HTTP request and writes the whole reply to `res`.
    pub async fn handle_request<S>(&self, req: &AdaptedRequest, res: S, body: Value)
    where
        S: ResponseSink,
    {
        let reply = self.process(req, body).await;
        debug!(
            session_id = %self.session_id,
            status = reply.status.as_u16(),
            "Streamable HTTP reply"
        );

        let mut res = res;
        res.write_head(reply.status, reply.headers);
        res.end(reply.body);
    }

    async fn process(&self, req: &AdaptedRequest, body: Value) -> Reply {
        if req.method != Method::POST {
            let mut reply = Reply::error(
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorCode::BAD_REQUEST,
                "Method not allowed.",
            );
            reply.headers.insert(ALLOW, HeaderValue::from_static("POST"));
            return reply;
        }

        if !accepts_json(req.header("accept")) {
            return Reply::error(
                StatusCode::NOT_ACCEPTABLE,
                ErrorCode::BAD_REQUEST,
                "Not Acceptable: Client must accept application/json",
            );
        }

        if !is_json(req.header("content-type")) {
            return Reply::error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorCode::BAD_REQUEST,
                "Unsupported Media Type: Content-Type must be application/json",
            );
        }

        let (messages, is_batch) = match parse_body(body) {
            Ok(parsed) => parsed,
            Err(error) => return Reply::json(StatusCode::BAD_REQUEST, &error),
        };

        if messages.iter().any(IncomingMessage::is_initialize) {
            if self.session.is_initialized() {
                return Reply::error(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidRequest,
                    "Invalid Request: Server already initialized",
                );
            }
            if messages.len() > 1 {
                return Reply::error(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidRequest,
                    "Invalid Request: Only one initialization request is allowed",
                );
            }
        } else if let Err(reply) = self.validate_session(req) {
            return reply;
        }

        let Some(server) = self.bound_server().await else {
            error!(session_id = %self.session_id, "Session transport is not connected");
            return Reply::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &JsonRpcError::internal_error(None, "Internal error: session is not connected"),
            );
        };

        let mut replies = Vec::with_capacity(messages.len());
        for msg in messages {
            if let Some(reply) = server.handle_message(&self.session, msg).await {
                replies.push(reply);
            }
        }

        let mut reply = match (replies.len(), is_batch) {
            (0, _) => Reply::accepted(),
            (1, false) => Reply::json(StatusCode::OK, &replies[0]),
            _ => Reply::json(StatusCode::OK, &replies),
        };
        if let Some(ref value) = self.session_header {
            reply.headers.insert(SESSION_ID_HEADER, value.clone());
        }
        reply
    }

    fn validate_session(&self, req: &AdaptedRequest) -> Result<(), Reply> {
        if !self.session.is_initialized() {
            return Err(Reply::error(
                StatusCode::BAD_REQUEST,
                ErrorCode::BAD_REQUEST,
                "Bad Request: Server not initialized",
            ));
        }

        match req.header(SESSION_ID_HEADER) {
            None => Err(Reply::error(
                StatusCode::BAD_REQUEST,
                ErrorCode::BAD_REQUEST,
                "Bad Request: Mcp-Session-Id header is required",
            )),
            Some(id) if id != self.session_id => {
                warn!(expected = %self.session_id, received = id, "Session id mismatch");
                Err(Reply::error(
                    StatusCode::NOT_FOUND,
                    ErrorCode::SESSION_NOT_FOUND,
                    "Session not found",
                ))
            }
            Some(_) => Ok(()),
        }
    }

    /// Waits for a pending bind and returns the bound server.
    async fn bound_server(&self) -> Option<Arc<McpServer>> {
        let mut rx = self.bind.subscribe();
        let state = rx
            .wait_for(|state| !matches!(state, BindState::Pending))
            .await
            .ok()?;
        match &*state {
            BindState::Bound(server) => Some(Arc::clone(server)),
            BindState::Pending | BindState::Failed => None,
        }
    }
}

#[async_trait]
impl ProtocolTransport for StreamableHttpTransport {
    fn session_id(&self) -> Option<&str> {
        Some(&self.session_id)
    }

    async fn start(&self, server: Arc<McpServer>) -> Result<(), TransportError> {
        let bound = self.bind.send_if_modified(|state| {
            if matches!(state, BindState::Pending) {
                *state = BindState::Bound(server);
                true
            } else {
                false
            }
        });

        if bound {
            Ok(())
        } else {
            Err(TransportError::AlreadyConnected)
        }
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Reply {
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let mut headers = HeaderMap::new();
        match serde_json::to_vec(value) {
            Ok(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self {
                    status,
                    headers,
                    body: Some(Bytes::from(body)),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to serialise reply");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    headers,
                    body: None,
                }
            }
        }
    }

    fn error(status: StatusCode, code: ErrorCode, message: &str) -> Self {
        Self::json(
            status,
            &JsonRpcError::new(None, JsonRpcErrorData::with_message(code, message)),
        )
    }

    fn accepted() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Splits a request body into messages. The flag is `true` for arrays.
fn parse_body(body: Value) -> Result<(Vec<IncomingMessage>, bool), JsonRpcError> {
    let invalid = || {
        JsonRpcError::new(
            None,
            JsonRpcErrorData::with_message(
                ErrorCode::ParseError,
                "Parse error: Invalid JSON-RPC message",
            ),
        )
    };

    match body {
        Value::Array(items) if items.is_empty() => Err(invalid()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| parse_value(item).map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()
            .map(|messages| (messages, true)),
        other => parse_value(other)
            .map(|message| (vec![message], false))
            .map_err(|_| invalid()),
    }
}

fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn accepts_json(accept: Option<&str>) -> bool {
    accept.map_or(true, |accept| {
        accept.split(',').any(|part| {
            matches!(
                media_type(part).as_str(),
                "application/json" | "application/*" | "*/*"
            )
        })
    })
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| media_type(ct) == "application/json")
}
