//! s3-mcp: MCP server for S3 object storage
//!
//! Serves the `list-buckets`, `list-objects` and `get-object` tools over
//! stdio (default) or HTTP.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use s3_mcp::app::Application;
use s3_mcp::config;
use s3_mcp::transport::TransportKind;

const ENVIRONMENT_HELP: &str = "\
Environment variables:
  AWS_REGION               AWS region (default: us-east-1)
  S3_BUCKETS               Comma-separated list of allowed buckets
  S3_MAX_BUCKETS           Maximum number of buckets to list (default: 5)
  AWS_ACCESS_KEY_ID        Access key id
  AWS_SECRET_ACCESS_KEY    Secret access key
  AWS_ENDPOINT             Custom endpoint, e.g. http://localhost:9000 for MinIO
  AWS_S3_FORCE_PATH_STYLE  Use path-style addressing (true/false)
  MCP_TRANSPORT            Set to 'http' to use the HTTP transport
  MCP_HOST                 HTTP bind address (default: 0.0.0.0)
  PORT                     HTTP port (default: 3000)
  MCP_CORS_ORIGIN          Allowed CORS origin (default: *)
  MCP_LOG_LEVEL            Log level: trace, debug, info, warn, error (default: warn)";

/// MCP server exposing S3 buckets and objects to AI assistants.
#[derive(Parser, Debug)]
#[command(name = "s3-mcp")]
#[command(version, about, long_about = None)]
#[command(disable_version_flag = true, ignore_errors = true)]
#[command(after_help = ENVIRONMENT_HELP)]
struct Args {
    /// Print version
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Serve over HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match config_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN, // Default to warn for unknown levels
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Always writes to stderr: stdout carries the stdio protocol.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the s3-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    if args.version {
        println!("s3-mcp {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let mut settings = match config::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("\n{ENVIRONMENT_HELP}");
            return ExitCode::FAILURE;
        }
    };

    if args.http {
        settings.transport = TransportKind::Http;
    }

    init_tracing(get_log_level(args.quiet, &settings.logging.level));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %settings.transport,
        "Starting s3-mcp server"
    );

    let app = match Application::new(settings) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to initialise server");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(app.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn http_flag_and_unknown_arguments() {
        let args = Args::parse_from(["s3-mcp", "--http", "--unknown"]);
        assert!(args.http);
        assert!(!args.quiet);
        assert!(!args.version);
    }

    #[test]
    fn short_version_flag() {
        let args = Args::parse_from(["s3-mcp", "-v"]);
        assert!(args.version);
    }

    #[test]
    fn log_level_selection() {
        assert_eq!(get_log_level(true, "debug"), Level::ERROR);
        assert_eq!(get_log_level(false, "DEBUG"), Level::DEBUG);
        assert_eq!(get_log_level(false, "nonsense"), Level::WARN);
    }
}
