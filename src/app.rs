//! Application bootstrap: settings to storage, tools, server and transport.

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::error::AppError;
use crate::mcp::server::McpServer;
use crate::s3::{RustS3Backend, S3Resource, StorageBackend};
use crate::tools::create_tools;
use crate::transport::{create_transport, shutdown_signal, TransportKind};

/// A configured server ready to run on its transport.
pub struct Application {
    settings: Settings,
    server: Arc<McpServer>,
}

impl Application {
    /// Builds the application against the configured S3 backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be configured.
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let backend = RustS3Backend::from_settings(&settings.s3)?;
        Ok(Self::with_backend(settings, Arc::new(backend)))
    }

    /// Builds the application against an arbitrary storage backend.
    #[must_use]
    pub fn with_backend(settings: Settings, backend: Arc<dyn StorageBackend>) -> Self {
        let s3 = Arc::new(S3Resource::from_settings(backend, &settings.s3));
        let server = Arc::new(McpServer::new(create_tools(&s3)));

        info!(
            allowed_buckets = ?s3.allowed_buckets(),
            max_buckets = settings.s3.max_buckets,
            "Storage configured"
        );

        Self { settings, server }
    }

    /// Returns the shared server.
    #[must_use]
    pub const fn server(&self) -> &Arc<McpServer> {
        &self.server
    }

    /// Runs until the transport finishes or a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to start or stop.
    pub async fn run(&self) -> Result<(), AppError> {
        let mut transport = create_transport(self.settings.transport, &self.settings.http);
        info!(transport = %transport.kind(), "Starting transport");

        transport.connect(Arc::clone(&self.server)).await?;

        if transport.kind() == TransportKind::Http {
            shutdown_signal().await;
        }

        self.server.shutdown();
        transport.disconnect().await?;
        Ok(())
    }
}
