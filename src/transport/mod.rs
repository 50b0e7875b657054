//! Transport abstraction.
//!
//! A [`Transport`] puts the shared [`McpServer`] on a channel: either the
//! process's standard streams (one implicit session) or an HTTP listener
//! multiplexing many sessions. The rest of the application only sees
//! `connect` and `disconnect`.

pub mod http;
pub mod stdio;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::error::TransportError;
use crate::mcp::server::McpServer;

pub use self::http::HttpTransport;
pub use self::stdio::StdioTransport;

/// Which transport variant to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// Standard input/output.
    #[default]
    Stdio,
    /// HTTP with streamable and event-stream endpoints.
    Http,
}

impl TransportKind {
    /// Interprets an `MCP_TRANSPORT` value. Anything but `http` or `sse`
    /// selects stdio.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" | "sse" => Self::Http,
            _ => Self::Stdio,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// A channel carrying MCP traffic to a server.
#[async_trait]
pub trait Transport: Send {
    /// The variant this transport implements.
    fn kind(&self) -> TransportKind;

    /// Starts accepting traffic for `server`.
    ///
    /// The stdio variant returns when its stream closes; the HTTP variant
    /// returns once it is listening.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be opened.
    async fn connect(&mut self, server: Arc<McpServer>) -> Result<(), TransportError>;

    /// Stops accepting new traffic and releases held resources.
    ///
    /// In-flight requests are not interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if resources cannot be released cleanly.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Creates the transport selected by `kind`.
#[must_use]
pub fn create_transport(kind: TransportKind, http: &HttpConfig) -> Box<dyn Transport> {
    match kind {
        TransportKind::Stdio => Box::new(StdioTransport::new()),
        TransportKind::Http => Box::new(HttpTransport::new(http.clone())),
    }
}

/// Resolves when the process is asked to stop (SIGINT or SIGTERM).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Cannot install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Resolves when the process is asked to stop (Ctrl+C).
#[cfg(windows)]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            warn!(error = %e, "Cannot install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
