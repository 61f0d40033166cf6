//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.
//! [`McpServer::handle_message`] is the whole protocol; `run_stdio` only moves
//! lines between the process streams and it.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::server::{NAME as SERVER_NAME, VERSION as SERVER_VERSION};
use crate::error::Result;
use crate::geogebra::session::EngineSession;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tools;
use crate::mcp::types::*;

/// MCP Server for GeoGebra
pub struct McpServer {
    /// Construction session shared by every tool call
    session: Arc<dyn EngineSession>,

    /// Tool registry
    registry: ToolRegistry,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a server with the full tool catalogue
    pub fn new(session: Arc<dyn EngineSession>) -> Result<Self> {
        Ok(Self::with_registry(session, tools::default_registry()?))
    }

    /// Create a server with a custom registry
    pub fn with_registry(session: Arc<dyn EngineSession>, registry: ToolRegistry) -> Self {
        Self {
            session,
            registry,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run the server on stdio until stdin closes
    pub async fn run_stdio(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!(
            "GeoGebra MCP server listening on stdio with {} tools",
            self.registry.len()
        );

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                stdout.write_all(response_str.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        if let Err(e) = self.session.cleanup().await {
            tracing::error!("Engine cleanup failed: {}", e);
        }

        Ok(())
    }

    /// Handle one incoming JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Unparseable message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let request = match Self::validate_envelope(raw) {
            Ok(request) => request,
            Err(response) => return Some(response),
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        tracing::debug!("Request {:?}: {}", id, request.method);

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request),
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(&request).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        })
    }

    /// Check the JSON-RPC framing before looking at the method
    fn validate_envelope(raw: Value) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
        let Value::Object(fields) = &raw else {
            return Err(JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request("Invalid request: expected a JSON object"),
            ));
        };

        let id = match fields.get("id") {
            None => None,
            Some(value) => match RequestId::from_value(value) {
                Some(id) => Some(id),
                None => {
                    return Err(JsonRpcResponse::error(
                        None,
                        JsonRpcError::invalid_request(
                            "Invalid request: id must be a string, an integer or null",
                        ),
                    ))
                }
            },
        };

        if fields.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Invalid request: jsonrpc must be \"2.0\""),
            ));
        }

        match fields.get("method").and_then(Value::as_str) {
            Some(method) if !method.is_empty() => {}
            _ => {
                return Err(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(
                        "Invalid request: method must be a non-empty string",
                    ),
                ))
            }
        }

        // serde reads `"id": null` as a missing id; keep the one parsed above
        let mut request: JsonRpcRequest = serde_json::from_value(raw).map_err(|e| {
            JsonRpcResponse::error(
                id.clone(),
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )
        })?;
        request.id = id;
        Ok(request)
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => {
                self.initialized = true;
                tracing::info!("Client initialized");
            }
            other => tracing::debug!("Ignoring notification: {}", other),
        }
    }

    /// Handle initialize request
    fn handle_initialize(
        &self,
        request: &JsonRpcRequest,
    ) -> std::result::Result<Value, JsonRpcError> {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Initialize from {} {} (protocol {})",
                client.name,
                client.version.as_deref().unwrap_or("?"),
                params.protocol_version.as_deref().unwrap_or("?")
            );
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> std::result::Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Handle call tool request
    async fn handle_call_tool(
        &self,
        request: &JsonRpcRequest,
    ) -> std::result::Result<Value, JsonRpcError> {
        let params = request
            .params
            .clone()
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool call parameters"))?;

        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| {
                JsonRpcError::invalid_params(format!("Invalid tool call parameters: {}", e))
            })?;

        let result = self
            .registry
            .execute_tool(self.session.as_ref(), &params.name, params.arguments)
            .await;

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }
}
