//! MCP server implementation for S3 object access.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Refusing new transports once the process is stopping
//!
//! # Architecture
//!
//! One [`McpServer`] is shared by every client. It owns the tool registry and
//! dispatches messages, but holds no per-client state: each protocol
//! transport carries its own [`SessionState`] and passes it in with every
//! message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::mcp::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION,
    SERVER_NAME, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::mcp::transport::ProtocolTransport;
use crate::tools::{Tool, ToolError};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    ///
    /// The message is prefixed with `Error: `, the uniform shape of every
    /// tool-level failure.
    #[must_use]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: format!("Error: {message}"),
            }],
            is_error: true,
        }
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|ToolContent::Text { text }| text.as_str())
    }
}

#[derive(Debug)]
struct SessionInner {
    state: ServerState,
    protocol_version: Option<String>,
    client_info: Option<ClientInfo>,
}

/// Lifecycle state of one client session.
///
/// Owned by a protocol transport; the shared [`McpServer`] reads and
/// advances it while dispatching that transport's messages.
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<SessionInner>,
}

impl SessionState {
    /// Creates a session awaiting its initialize request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: ServerState::AwaitingInit,
                protocol_version: None,
                client_info: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.lock().state
    }

    /// Returns `true` once an initialize request has been accepted.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !matches!(
            self.state(),
            ServerState::AwaitingInit | ServerState::ShuttingDown
        )
    }

    /// Returns the negotiated protocol version, if any.
    #[must_use]
    pub fn protocol_version(&self) -> Option<String> {
        self.lock().protocol_version.clone()
    }

    /// Returns the client name announced during initialisation.
    #[must_use]
    pub fn client_name(&self) -> Option<String> {
        self.lock().client_info.as_ref().map(|c| c.name.clone())
    }

    /// Marks the session as shutting down.
    pub fn shut_down(&self) {
        self.lock().state = ServerState::ShuttingDown;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// The MCP server shared by every session.
pub struct McpServer {
    /// Name and version reported to clients.
    info: ServerInfo,
    /// Registered tools, in listing order.
    tools: Vec<Box<dyn Tool>>,
    /// Set once the server stops accepting new transports.
    closed: watch::Sender<bool>,
}

impl McpServer {
    /// Creates a new MCP server exposing the given tools.
    #[must_use]
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self {
            info: ServerInfo::default(),
            tools,
            closed: watch::channel(false).0,
        }
    }

    /// Returns the server information reported to clients.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Binds a protocol transport to this server and starts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server has been shut down or the transport
    /// fails to start.
    pub async fn connect<T>(self: &Arc<Self>, transport: &T) -> Result<(), TransportError>
    where
        T: ProtocolTransport + ?Sized,
    {
        if self.is_closed() {
            return Err(TransportError::ServerClosed);
        }

        debug!(
            session_id = transport.session_id().unwrap_or("-"),
            "Binding protocol transport"
        );
        transport.start(Arc::clone(self)).await
    }

    /// Stops accepting new transports. Already-bound transports keep working.
    pub fn shutdown(&self) {
        let newly_closed = self.closed.send_if_modified(|closed| !std::mem::replace(closed, true));
        if newly_closed {
            info!("MCP server no longer accepting new sessions");
        }
    }

    /// Returns `true` once [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once [`Self::shutdown`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this only ends on shutdown.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Handles one incoming message for the given session.
    ///
    /// Returns the reply for requests and `None` for notifications.
    pub async fn handle_message(
        &self,
        session: &SessionState,
        msg: IncomingMessage,
    ) -> Option<OutgoingMessage> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(session, req).await),
            IncomingMessage::Notification(ref notif) => {
                Self::handle_notification(session, notif);
                None
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&self, session: &SessionState, req: JsonRpcRequest) -> OutgoingMessage {
        debug!(method = %req.method, id = %req.id, "Handling request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(session, &req),
            "tools/list" => self.handle_tools_list(session, &req),
            "tools/call" => self.handle_tools_call(session, &req).await,
            "ping" => Ok(Self::handle_ping(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        response.into()
    }

    /// Handles an incoming notification.
    fn handle_notification(session: &SessionState, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" {
            let mut inner = session.lock();
            if inner.state == ServerState::Initialising {
                inner.state = ServerState::Running;
            }
        } else {
            debug!(method = %notif.method, "Ignoring notification");
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(
        &self,
        session: &SessionState,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        let negotiated_version = negotiate_version(&params.protocol_version);

        {
            let mut inner = session.lock();
            if inner.state != ServerState::AwaitingInit {
                return Err(JsonRpcError::new(
                    Some(req.id.clone()),
                    JsonRpcErrorData::with_message(
                        ErrorCode::InvalidRequest,
                        "Server already initialised",
                    ),
                ));
            }
            inner.state = ServerState::Initialising;
            inner.protocol_version = Some(negotiated_version.to_string());
            inner.client_info.clone_from(&params.client_info);
        }

        info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            protocol_version = negotiated_version,
            "Client initialised"
        );

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": self.info,
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(
        &self,
        session: &SessionState,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        Self::require_initialized(session, &req.id)?;

        let tools: Vec<ToolDefinition> = self.tools.iter().map(|t| t.definition()).collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools }),
        ))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        session: &SessionState,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        Self::require_initialized(session, &req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result = match self.tools.iter().find(|t| t.name() == params.name) {
            Some(tool) => match tool.execute(params.arguments).await {
                Ok(result) => result,
                Err(ToolError::InvalidArguments(message)) => {
                    return Err(JsonRpcError::invalid_params(
                        req.id.clone(),
                        format!("Invalid arguments for tool {}: {message}", params.name),
                    ));
                }
            },
            None => ToolCallResult::error(format!("Unknown tool: {}", params.name)),
        };

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                Some(req.id.clone()),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the session has completed the initialize request.
    fn require_initialized(session: &SessionState, id: &RequestId) -> Result<(), JsonRpcError> {
        if !session.is_initialized() {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

/// Picks the protocol version to answer an initialize request with.
fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(MCP_PROTOCOL_VERSION)
}
