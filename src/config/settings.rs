//! Configuration structures.
//!
//! These structures are populated from environment variables by
//! [`super::load_settings`]. Every field has a default so an empty
//! environment yields a working stdio server against `us-east-1`.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::ConfigError;
use crate::transport::TransportKind;

/// Root configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Which transport variant to start.
    pub transport: TransportKind,

    /// Object storage settings.
    pub s3: S3Settings,

    /// HTTP transport settings (ignored by the stdio transport).
    pub http: HttpConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Settings {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.s3.region.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "AWS_REGION cannot be empty".to_string(),
            });
        }
        if let Some(ref endpoint) = self.s3.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "AWS_ENDPOINT '{endpoint}' must start with http:// or https://"
                    ),
                });
            }
        }
        if self.http.cors.origin.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "MCP_CORS_ORIGIN cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Explicit access key pair.
#[derive(Clone)]
pub struct StaticCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Object storage configuration.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Backend region.
    pub region: String,

    /// Allow-list of bucket names. Empty means every bucket is visible.
    pub allowed_buckets: Vec<String>,

    /// Maximum number of buckets returned by a listing.
    pub max_buckets: usize,

    /// Explicit credentials; `None` falls back to the ambient credential chain.
    pub credentials: Option<StaticCredentials>,

    /// Custom endpoint URL (MinIO and other S3-compatible stores).
    pub endpoint: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets.
    pub force_path_style: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            allowed_buckets: Vec::new(),
            max_buckets: DEFAULT_MAX_BUCKETS,
            credentials: None,
            endpoint: None,
            force_path_style: false,
        }
    }
}

/// Default number of buckets returned by a listing.
pub const DEFAULT_MAX_BUCKETS: usize = 5;

/// Default listening port for the HTTP transport.
pub const DEFAULT_PORT: u16 = 3000;

fn default_region() -> String {
    "us-east-1".to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind.
    pub host: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Cross-origin settings applied to every route.
    pub cors: CorsConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin resource sharing configuration.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origin; `*` allows any.
    pub origin: String,

    /// Allowed request methods.
    pub allow_methods: Vec<String>,

    /// Allowed request headers.
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            allow_methods: ["GET", "POST", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_headers: [
                "Content-Type",
                "Authorization",
                "Accept",
                "x-mcp-session-id",
                "mcp-session-id",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
