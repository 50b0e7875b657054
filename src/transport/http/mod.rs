//! Multi-session HTTP transport.
//!
//! Routes:
//!
//! | Method | Path      | Handler                                  |
//! |--------|-----------|------------------------------------------|
//! | GET    | `/health` | liveness check                           |
//! | POST   | `/mcp`    | [`adapter`]: one request, one response   |
//! | GET    | `/mcp`    | redirect to `/sse`                       |
//! | GET    | `/sse`    | [`bridge`]: long-lived event stream      |
//!
//! Every route carries CORS headers; `OPTIONS` requests answer 204.

pub mod adapter;
pub mod bridge;
pub mod registry;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use http::header::{HeaderName, HeaderValue, LOCATION};
use http::{Method, StatusCode};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{CorsConfig, HttpConfig};
use crate::error::TransportError;
use crate::mcp::server::McpServer;
use crate::mcp::transport::SESSION_ID_HEADER;
use crate::transport::{Transport, TransportKind};

pub use registry::{Session, SessionRegistry};

/// State shared by every route.
#[derive(Clone)]
pub struct HttpState {
    /// The server all sessions bind to.
    pub server: Arc<McpServer>,
    /// Request/response sessions.
    pub registry: Arc<SessionRegistry>,
}

/// Builds the router for the HTTP transport.
pub fn router(state: HttpState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(adapter::handle_post).get(redirect_to_sse))
        .route("/sse", get(bridge::handle_sse))
        .with_state(state)
        .layer(cors_layer(cors))
        .layer(middleware::from_fn(no_content_options))
        .layer(TraceLayer::new_for_http())
}

/// The fixed body returned for adapter and bridge failures.
pub(crate) fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn redirect_to_sse() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, "/sse")])
}

/// Answers every `OPTIONS` request with 204, keeping the CORS headers.
async fn no_content_options(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let response = next.run(request).await;
    let mut no_content = StatusCode::NO_CONTENT.into_response();
    *no_content.headers_mut() = response.headers().clone();
    no_content
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(config.origin.trim()) {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(e) => {
                warn!(origin = %config.origin, error = %e, "Invalid CORS origin, allowing any");
                AllowOrigin::any()
            }
        }
    };

    let methods: Vec<Method> = config
        .allow_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .allow_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)])
}

/// HTTP transport serving many sessions from one listener.
pub struct HttpTransport {
    config: HttpConfig,
    registry: Arc<SessionRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl HttpTransport {
    /// Creates an unstarted transport.
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            shutdown: None,
            task: None,
            local_addr: None,
        }
    }

    /// Returns the session registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Returns the bound address once listening.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    async fn connect(&mut self, server: Arc<McpServer>) -> Result<(), TransportError> {
        if self.task.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let listener = TcpListener::bind((self.config.host, self.config.port)).await?;
        let local_addr = listener.local_addr()?;

        let state = HttpState {
            server,
            registry: Arc::clone(&self.registry),
        };
        let app = router(state, &self.config.cors);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        });

        info!(address = %local_addr, "MCP HTTP server listening");
        info!("Health check: http://{local_addr}/health");
        info!("MCP endpoint: http://{local_addr}/mcp");
        info!("SSE endpoint: http://{local_addr}/sse");

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        self.local_addr = Some(local_addr);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.registry.clear();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // Event streams end on server shutdown; the listener drains in the background.
        drop(self.task.take());
        info!("MCP HTTP server stopped accepting connections");
        Ok(())
    }
}
