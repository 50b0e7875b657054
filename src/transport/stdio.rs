//! Single-stream transport over standard input/output.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::TransportError;
use crate::mcp::server::McpServer;
use crate::mcp::transport::StdioServerTransport;
use crate::transport::{Transport, TransportKind};

/// Binds the process's standard streams to one protocol session.
///
/// `connect` returns only when stdin closes or a shutdown signal arrives.
#[derive(Debug, Default)]
pub struct StdioTransport;

impl StdioTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn connect(&mut self, server: Arc<McpServer>) -> Result<(), TransportError> {
        info!("MCP server ready on stdio, waiting for client messages");
        let transport = StdioServerTransport::new();
        server.connect(&transport).await
    }

    // Standard streams have no explicit teardown.
    async fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
