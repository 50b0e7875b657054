//! s3-mcp: MCP server exposing S3 object storage to AI assistants
//!
//! Three tools are offered: `list-buckets`, `list-objects` and `get-object`.
//! Text objects come back verbatim, PDFs as extracted text, anything else as
//! a short base64 preview. An optional bucket allow-list restricts what is
//! visible.
//!
//! # Transports
//!
//! - **stdio**: one session over the process's standard streams
//! - **HTTP**: many sessions behind `POST /mcp`, plus a legacy event stream
//!   on `GET /sse`
//!
//! # Modules
//!
//! - [`app`]: Application bootstrap
//! - [`config`]: Environment configuration
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`s3`]: Object storage access
//! - [`tools`]: MCP tools
//! - [`transport`]: stdio and HTTP transports

pub mod app;
pub mod config;
pub mod error;
pub mod mcp;
pub mod s3;
pub mod tools;
pub mod transport;
