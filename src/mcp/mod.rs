//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the Model Context Protocol for exposing object storage
//! operations as tools to AI assistants. Messages are JSON-RPC 2.0.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Protocol   │───▶│   Server    │───▶│   Tools     │     │
//! │   │  transport  │    │ (dispatch)  │    │  (handlers) │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                  │                               │
//! │          ▼                  ▼                               │
//! │   ┌──────────────┐   ┌──────────────┐                       │
//! │   │ SessionState │   │  JSON-RPC    │                       │
//! │   │ (per client) │   │  messages    │                       │
//! │   └──────────────┘   └──────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! The latest supported version is 2025-03-26; 2024-11-05 and 2024-10-07 are
//! accepted when a client asks for them.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, SessionState, ToolCallResult, ToolDefinition};
pub use transport::{
    AdaptedRequest, ProtocolTransport, ResponseSink, SseServerTransport, StdioServerTransport,
    StreamableHttpTransport,
};
