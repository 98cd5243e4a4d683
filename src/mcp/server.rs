//! MCP server implementation for document reranking.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: EOF on stdin or a termination signal
//!
//! # Concurrency
//!
//! Every inbound line is handled on its own task, so a slow upstream call
//! only delays its own response. Responses are written in completion order.
//! The only state shared between requests is the [`Session`] flag.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::task::JoinSet;

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::mcp::tools::{Tool, ToolCallParams, ToolCallResult, ToolDefinition};
use crate::mcp::transport::{self, LineReader, MessageWriter};
use crate::rerank::{RerankClient, RerankRequest};

/// Per-connection state.
///
/// `initialized` is informational: it is set by `initialize` and never used
/// to reject a request.
#[derive(Debug, Default)]
pub struct Session {
    initialized: AtomicBool,
}

impl Session {
    /// Creates a session that has not seen `initialize` yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether `initialize` has been received.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Relaxed);
    }
}

/// The JSON-RPC methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `initialized` / `notifications/initialized`
    Initialized,
    /// `ping`
    Ping,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// Anything else.
    Unknown,
}

impl Method {
    /// Classifies a method name.
    #[must_use]
    pub fn parse(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "initialized" | "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            _ => Self::Unknown,
        }
    }
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
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Picks the protocol version to answer `initialize` with.
///
/// Echoes the client's version if supported, otherwise offers the latest.
#[must_use]
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v))
        .copied()
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// Turns raw protocol lines into responses.
pub struct McpHandler {
    client: Arc<dyn RerankClient>,
}

impl McpHandler {
    /// Creates a handler that forwards rerank calls to `client`.
    #[must_use]
    pub fn new(client: Arc<dyn RerankClient>) -> Self {
        Self { client }
    }

    /// Handles one raw message.
    ///
    /// Returns `None` when nothing should be written back (notifications).
    /// Never fails: every problem becomes a JSON-RPC error.
    pub async fn handle(&self, session: &Session, raw: &str) -> Option<OutgoingMessage> {
        match parse_message(raw) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(session, req).await,
            Ok(IncomingMessage::Notification(notif)) => {
                Self::handle_notification(session, &notif);
                None
            }
            Err(error) => {
                tracing::debug!(code = error.code(), "Rejected malformed message");
                Some(error.into())
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(
        &self,
        session: &Session,
        req: JsonRpcRequest,
    ) -> Option<OutgoingMessage> {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let response = match Method::parse(&req.method) {
            Method::Initialize => Ok(Self::handle_initialize(session, &req)),
            Method::Initialized => return None,
            Method::Ping => Ok(Self::handle_ping(&req)),
            Method::ToolsList => Ok(Self::handle_tools_list(&req)),
            Method::ToolsCall => self.handle_tools_call(&req).await,
            Method::Unknown => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        Some(match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        })
    }

    /// Handles an incoming notification.
    fn handle_notification(session: &Session, notif: &JsonRpcNotification) {
        match Method::parse(&notif.method) {
            Method::Initialize => session.mark_initialized(),
            Method::Initialized => tracing::info!("Client completed initialisation"),
            Method::Ping | Method::ToolsList | Method::ToolsCall | Method::Unknown => {
                tracing::debug!(method = %notif.method, "Ignoring notification");
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(session: &Session, req: &JsonRpcRequest) -> JsonRpcResponse {
        // Lenient: clients differ in what they send and none of it gates us.
        let params: InitializeParams = req
            .params
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                "Client connected"
            );
        }

        let version = negotiate_protocol_version(params.protocol_version.as_deref());
        session.mark_initialized();

        let result = json!({
            "protocolVersion": version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        JsonRpcResponse::success(req.id.clone(), result)
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(req: &JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = Tool::ALL.iter().map(|t| t.definition()).collect();

        let result = json!({
            "tools": tools,
        });

        JsonRpcResponse::success(req.id.clone(), result)
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = match req.params.as_ref() {
            None => {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    "Missing tool call params",
                ))
            }
            Some(p) if !p.is_object() => {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    "Tool call params must be an object",
                ))
            }
            Some(p) => serde_json::from_value(p.clone()).map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?,
        };

        let Some(tool) = Tool::from_name(&params.name) else {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::MethodNotFound,
                    format!("Unknown tool: {}", params.name),
                ),
            ));
        };

        let result = match tool {
            Tool::GetReranking => self.call_get_reranking(&req.id, &params.arguments).await?,
        };

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Validates arguments, calls upstream and packages the ranking as text.
    async fn call_get_reranking(
        &self,
        id: &RequestId,
        arguments: &Value,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let request = RerankRequest::from_arguments(arguments)
            .map_err(|e| JsonRpcError::invalid_params(id.clone(), e.to_string()))?;

        let response = self.client.rerank(&request).await.map_err(|e| {
            tracing::warn!(id = %id, error = %e, "Rerank call failed");
            JsonRpcError::internal_error(id.clone(), e.to_string())
        })?;

        let text = serde_json::to_string(&response).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise rerank response");
            JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
        })?;

        Ok(ToolCallResult::text(text))
    }
}

/// The MCP server for document reranking.
pub struct McpServer {
    handler: Arc<McpHandler>,
    session: Arc<Session>,
}

impl McpServer {
    /// Creates a new MCP server that ranks through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn RerankClient>) -> Self {
        Self {
            handler: Arc::new(McpHandler::new(client)),
            session: Arc::new(Session::new()),
        }
    }

    /// Returns the connection's session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the MCP server on stdio with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&self) -> io::Result<()> {
        let (reader, writer) = transport::stdio();
        self.run_with_shutdown(reader, writer).await
    }

    /// Runs the serve loop until EOF or a termination signal.
    #[cfg(unix)]
    async fn run_with_shutdown<R, W>(
        &self,
        reader: LineReader<R>,
        writer: MessageWriter<W>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
                Ok(())
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                Ok(())
            }

            served = self.serve(reader, writer) => served.map(|_| ()),
        }
    }

    /// Runs the serve loop until EOF or a termination signal.
    #[cfg(windows)]
    async fn run_with_shutdown<R, W>(
        &self,
        reader: LineReader<R>,
        writer: MessageWriter<W>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                Ok(())
            }

            served = self.serve(reader, writer) => served.map(|_| ()),
        }
    }

    /// Serves messages from `reader` until EOF, then drains in-flight
    /// requests and hands the writer back.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W>(
        &self,
        mut reader: LineReader<R>,
        mut writer: MessageWriter<W>,
    ) -> io::Result<MessageWriter<W>>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut in_flight = JoinSet::new();
        let mut reading = true;

        loop {
            tokio::select! {
                line = reader.read_line(), if reading => {
                    match line? {
                        Some(Ok(line)) if line.trim().is_empty() => {}
                        Some(Ok(line)) => {
                            let handler = Arc::clone(&self.handler);
                            let session = Arc::clone(&self.session);
                            in_flight.spawn(async move { handler.handle(&session, &line).await });
                        }
                        Some(Err(e)) => {
                            tracing::debug!(error = %e, "Rejected line that is not valid UTF-8");
                            let reply = OutgoingMessage::from(JsonRpcError::parse_error());
                            writer.write_message(&reply).await?;
                        }
                        None => {
                            tracing::debug!(pending = in_flight.len(), "Input closed");
                            reading = false;
                        }
                    }
                }

                Some(joined) = in_flight.join_next() => {
                    match joined {
                        Ok(Some(message)) => writer.write_message(&message).await?,
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "Request task failed"),
                    }
                }

                else => break,
            }
        }

        Ok(writer)
    }
}
