//! MCP server - main event loop and request handling
//!
//! Reads newline-delimited JSON-RPC requests, routes them to the catalog and
//! the service gateway, and writes one response line per request.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::x402::ServiceGateway;

use super::catalog::ServiceCatalog;
use super::protocol::*;

/// MCP server exposing the service catalog as tools
pub struct McpServer {
    catalog: ServiceCatalog,
    gateway: Arc<ServiceGateway>,
}

impl McpServer {
    pub fn new(catalog: ServiceCatalog, gateway: Arc<ServiceGateway>) -> Self {
        Self { catalog, gateway }
    }

    fn log(&self, msg: &str) {
        tracing::debug!(target: "coinrailz_mcp::mcp", "{}", msg);
    }

    /// Serve over stdin/stdout until EOF
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Main event loop over an arbitrary line-oriented transport
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // Detached: reported once per process
        drop(self.gateway.announce_install());

        self.log("Server started, waiting for requests...");
        self.log(&format!("Available tools: {}", self.catalog.tools.len()));

        let mut buf = Vec::new();
        loop {
            buf.clear();

            let bytes_read = reader.read_until(b'\n', &mut buf).await?;
            if bytes_read == 0 {
                self.log("EOF received, shutting down");
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => Some(JsonRpcResponse::parse_error(&e.to_string())),
            };

            if let Some(response) = response {
                if let Some(ref error) = response.error {
                    self.log(&format!("-> error: {}", error));
                } else {
                    self.log("-> ok");
                }
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }

    /// Handle one input line; `None` when no response is due
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => return Some(JsonRpcResponse::parse_error(&e.to_string())),
        };

        self.log(&format!("<- {} (id={:?})", request.method, request.id));

        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        if !request.is_valid() {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        Some(self.handle_request(request).await)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => self.log("Client initialized"),
            "notifications/cancelled" => self.log("Request cancelled"),
            _ => self.log(&format!("Unknown notification: {}", request.method)),
        }
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(req.params).await,
            "ping" => Ok(json!({})),
            method => Err(JsonRpcError::method_not_found(method)),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    fn handle_initialize(&self) -> Result<Value, JsonRpcError> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.catalog.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let tools = self
            .catalog
            .tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name.clone(),
                description: t.full_description(),
                input_schema: t.input_schema(),
            })
            .collect();

        serde_json::to_value(ToolsListResult { tools })
            .map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
        let call_params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

        let call = self
            .catalog
            .prepare(&call_params.name, call_params.arguments.as_ref())
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        self.log(&format!("Executing tool: {} -> {}", call_params.name, call.service));

        let outcome = self
            .gateway
            .invoke(&call)
            .await
            .map_err(|e| JsonRpcError::internal(e.to_string()))?;

        let result = ToolCallResult::json(&outcome.to_tool_value(&call.service), !outcome.is_success());
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }
}

/// Write a JSON-RPC response as a single line
async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let output = serde_json::to_string(response)?;
    writer.write_all(output.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
