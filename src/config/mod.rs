//! Configuration loading.
//!
//! All settings come from environment variables, read once at startup.
//!
//! | Variable                  | Meaning                                   | Default      |
//! |---------------------------|-------------------------------------------|--------------|
//! | `AWS_REGION`              | Backend region                            | `us-east-1`  |
//! | `S3_BUCKETS`              | Comma-separated bucket allow-list         | (all)        |
//! | `S3_MAX_BUCKETS`          | Maximum buckets returned by a listing     | `5`          |
//! | `AWS_ACCESS_KEY_ID`       | Explicit access key                       |              |
//! | `AWS_SECRET_ACCESS_KEY`   | Explicit secret key                       |              |
//! | `AWS_ENDPOINT`            | Custom endpoint (e.g. MinIO)              |              |
//! | `AWS_S3_FORCE_PATH_STYLE` | `true` for path-style addressing          | `false`      |
//! | `MCP_TRANSPORT`           | `http` selects the HTTP transport         | `stdio`      |
//! | `MCP_HOST`                | HTTP bind address                         | `0.0.0.0`    |
//! | `PORT`                    | HTTP listening port                       | `3000`       |
//! | `MCP_CORS_ORIGIN`         | Allowed CORS origin                       | `*`          |
//! | `MCP_LOG_LEVEL`           | Log level                                 | `warn`       |

mod settings;

pub use settings::{
    CorsConfig, HttpConfig, LoggingConfig, S3Settings, Settings, StaticCredentials,
    DEFAULT_MAX_BUCKETS, DEFAULT_PORT,
};

use std::str::FromStr;

use crate::error::ConfigError;
use crate::transport::TransportKind;

/// Loads settings from the process environment.
///
/// # Errors
///
/// Returns an error if a variable holds an unparseable value or the
/// resulting configuration fails validation.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(|name| std::env::var(name).ok())
}

/// Loads settings using `lookup` to resolve variable names.
///
/// # Errors
///
/// Returns an error if a variable holds an unparseable value or the
/// resulting configuration fails validation.
pub fn load_settings_from<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let mut settings = Settings::default();

    if let Some(transport) = var("MCP_TRANSPORT") {
        settings.transport = TransportKind::from_env_value(&transport);
    }

    if let Some(region) = var("AWS_REGION") {
        settings.s3.region = region;
    }
    if let Some(buckets) = var("S3_BUCKETS") {
        settings.s3.allowed_buckets = parse_bucket_list(&buckets);
    }
    if let Some(max) = var("S3_MAX_BUCKETS") {
        settings.s3.max_buckets = parse_value("S3_MAX_BUCKETS", &max)?;
    }
    if let (Some(access_key_id), Some(secret_access_key)) =
        (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY"))
    {
        settings.s3.credentials = Some(StaticCredentials {
            access_key_id,
            secret_access_key,
        });
    }
    settings.s3.endpoint = var("AWS_ENDPOINT");
    if let Some(path_style) = var("AWS_S3_FORCE_PATH_STYLE") {
        settings.s3.force_path_style = parse_value("AWS_S3_FORCE_PATH_STYLE", &path_style)?;
    }

    if let Some(host) = var("MCP_HOST") {
        settings.http.host = parse_value("MCP_HOST", &host)?;
    }
    if let Some(port) = var("PORT") {
        settings.http.port = parse_value("PORT", &port)?;
    }
    if let Some(origin) = var("MCP_CORS_ORIGIN") {
        settings.http.cors.origin = origin;
    }

    if let Some(level) = var("MCP_LOG_LEVEL") {
        settings.logging.level = level;
    }

    settings.validate()?;

    Ok(settings)
}

/// Splits a comma-separated bucket list, dropping blank entries.
#[must_use]
pub fn parse_bucket_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|bucket| !bucket.is_empty())
        .map(String::from)
        .collect()
}

fn parse_value<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        load_settings_from(|name| env.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let settings = assert_ok!(load(&[]));
        assert_eq!(settings.transport, TransportKind::Stdio);
        assert_eq!(settings.s3.region, "us-east-1");
        assert_eq!(settings.s3.max_buckets, DEFAULT_MAX_BUCKETS);
        assert_eq!(settings.http.port, DEFAULT_PORT);
    }

    #[test]
    fn full_environment() {
        let settings = load(&[
            ("MCP_TRANSPORT", "http"),
            ("AWS_REGION", "eu-west-1"),
            ("S3_BUCKETS", "test-bucket-1, test-bucket-2,,"),
            ("S3_MAX_BUCKETS", "10"),
            ("AWS_ACCESS_KEY_ID", "minioadmin"),
            ("AWS_SECRET_ACCESS_KEY", "minioadmin"),
            ("AWS_ENDPOINT", "http://localhost:9000"),
            ("AWS_S3_FORCE_PATH_STYLE", "true"),
            ("PORT", "3001"),
            ("MCP_CORS_ORIGIN", "http://localhost:5173"),
            ("MCP_LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert_eq!(settings.transport, TransportKind::Http);
        assert_eq!(settings.s3.region, "eu-west-1");
        assert_eq!(
            settings.s3.allowed_buckets,
            vec!["test-bucket-1".to_string(), "test-bucket-2".to_string()]
        );
        assert_eq!(settings.s3.max_buckets, 10);
        assert!(settings.s3.credentials.is_some());
        assert_eq!(
            settings.s3.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(settings.s3.force_path_style);
        assert_eq!(settings.http.port, 3001);
        assert_eq!(settings.http.cors.origin, "http://localhost:5173");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn credentials_require_both_halves() {
        let settings = load(&[("AWS_ACCESS_KEY_ID", "only-the-key")]).unwrap();
        assert!(settings.s3.credentials.is_none());
    }

    #[test]
    fn reject_invalid_port() {
        let err = assert_err!(load(&[("PORT", "not-a-port")]));
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));
    }

    #[test]
    fn reject_invalid_max_buckets() {
        let err = assert_err!(load(&[("S3_MAX_BUCKETS", "-1")]));
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "S3_MAX_BUCKETS",
                ..
            }
        ));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let settings = load(&[("AWS_REGION", "  "), ("PORT", "")]).unwrap();
        assert_eq!(settings.s3.region, "us-east-1");
        assert_eq!(settings.http.port, DEFAULT_PORT);
    }

    #[test]
    fn reject_invalid_path_style_flag() {
        assert_err!(load(&[("AWS_S3_FORCE_PATH_STYLE", "yes")]));
        assert_ok!(load(&[("AWS_S3_FORCE_PATH_STYLE", "false")]));
    }

    #[test]
    fn sse_transport_value_selects_http() {
        let settings = assert_ok!(load(&[("MCP_TRANSPORT", "sse")]));
        assert_eq!(settings.transport, TransportKind::Http);
    }

    #[test]
    fn bucket_list_parsing() {
        assert_eq!(parse_bucket_list("a,b"), vec!["a", "b"]);
        assert_eq!(parse_bucket_list(" a , ,b "), vec!["a", "b"]);
        assert!(parse_bucket_list(",,").is_empty());
    }
}
