//! Error types for s3-mcp.
//!
//! # Security Note
//!
//! Errors surfaced over HTTP are mapped to a fixed, generic body by the
//! adapter layer. The variants below may carry backend detail for logging,
//! but that detail never reaches an HTTP client verbatim.

use thiserror::Error;

/// Errors that can occur while loading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        /// Name of the environment variable.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the object-storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The bucket is outside the configured allow-list.
    #[error("Bucket {bucket} is not in the allowed buckets list")]
    AccessDenied {
        /// The rejected bucket name.
        bucket: String,
    },

    /// The storage backend could not be configured.
    #[error("{message}")]
    Configuration {
        /// Description of the configuration failure.
        message: String,
    },

    /// The storage backend reported a failure.
    #[error("{message}")]
    Backend {
        /// Backend error message, passed through unchanged.
        message: String,
    },
}

impl StorageError {
    /// Creates a backend error from any displayable error.
    #[must_use]
    pub fn backend(error: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: error.to_string(),
        }
    }

    /// Returns `true` if this is an allow-list rejection.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

/// Errors raised when starting or stopping a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The protocol transport is already bound to a server.
    #[error("transport already connected")]
    AlreadyConnected,

    /// The server no longer accepts new transports.
    #[error("server is shut down")]
    ServerClosed,

    /// The response stream backing a transport was closed.
    #[error("response stream closed")]
    StreamClosed,

    /// An I/O error on the underlying channel or listener.
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),
}

/// Errors raised while adapting an HTTP request to a protocol transport.
///
/// Every variant maps to the same opaque HTTP 500 response.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The request body could not be read.
    #[error("failed to read request body")]
    Body(#[source] axum::Error),

    /// The request body is not valid JSON.
    #[error("request body is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    /// The query string could not be decoded.
    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    /// A header value could not be represented.
    #[error("invalid header value")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The protocol transport dropped the response without completing it.
    #[error("protocol transport did not complete the response")]
    ResponseDropped,

    /// The outgoing response could not be assembled.
    #[error("failed to build response")]
    Http(#[from] http::Error),

    /// Binding a protocol transport failed.
    #[error("failed to connect protocol transport")]
    Transport(#[from] TransportError),
}

/// Errors that stop the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// The storage backend could not be set up.
    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),

    /// The transport failed to start or stop.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}
