//! MCP server: newline-delimited JSON-RPC over any async byte stream.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::protocol::{
    error_codes, McpRequest, McpResponse, ResourceCapabilities, ServerCapabilities, ServerInfo,
    ToolCallResult, ToolCapabilities, PROTOCOL_VERSION,
};
use crate::tools::{ServerSelection, ToolContext, ToolRegistry};

/// Workspace MCP server.
pub struct WorkspaceMcpServer {
    /// Tool registry.
    registry: ToolRegistry,
    /// Server info.
    server_info: ServerInfo,
    /// Whether the client sent `initialized`.
    initialized: bool,
}

impl WorkspaceMcpServer {
    /// Create a server over a prepared registry.
    pub fn new(registry: ToolRegistry, server_info: ServerInfo) -> Self {
        Self {
            registry,
            server_info,
            initialized: false,
        }
    }

    /// Create a server exposing `selection`, with services built from config.
    pub fn from_config(selection: ServerSelection, config: &WorkspaceConfig) -> Result<Self> {
        let context = ToolContext::from_config(config)?;
        let registry = ToolRegistry::for_groups(&selection.groups(), context);
        Ok(Self::new(registry, ServerInfo::named(selection.server_name())))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio.
    pub async fn run_stdio(&mut self) -> Result<()> {
        info!("Starting {} MCP server on stdio", self.server_info.name);
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// A line that is not valid UTF-8 gets a parse error and the session
    /// continues.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("Received: {}", line);
                    self.handle_message(line).await
                }
                Err(e) => {
                    error!("Received a line that is not UTF-8: {}", e);
                    Some(McpResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("invalid UTF-8: {}", e),
                    ))
                }
            };

            let Some(response) = response else {
                continue;
            };
            let response_json = serde_json::to_string(&response)?;

            debug!("Sending: {}", response_json);

            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle a single message. Notifications yield `None`.
    pub async fn handle_message(&mut self, message: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(McpResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    e.to_string(),
                ));
            }
        };

        let id = value.get("id").cloned();
        let request: McpRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                warn!("Malformed request: {}", e);
                return Some(McpResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    e.to_string(),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            if request.is_notification() {
                return None;
            }
            return Some(McpResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                format!("unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        Some(match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "initialized" | "notifications/initialized" => {
                self.handle_notification(&request);
                McpResponse::success(request.id.clone(), json!({}))
            }
            "ping" => self.handle_ping(&request),
            "tools/list" => self.handle_tools_list(&request),
            "tools/call" => self.handle_tools_call(&request).await,
            "resources/list" => McpResponse::success(request.id.clone(), json!({ "resources": [] })),
            "resources/templates/list" => self.handle_templates_list(&request),
            "resources/read" => self.handle_resources_read(&request),
            _ => McpResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("unknown method: {}", request.method),
            ),
        })
    }

    fn handle_notification(&mut self, request: &McpRequest) {
        match request.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                info!("MCP session initialized");
            }
            other => debug!("Ignoring notification {}", other),
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&mut self, request: &McpRequest) -> McpResponse {
        info!("Initializing MCP server");

        let capabilities = ServerCapabilities {
            tools: Some(ToolCapabilities { list_changed: false }),
            resources: Some(ResourceCapabilities::default()),
            prompts: None,
        };

        McpResponse::success(
            request.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": capabilities,
                "serverInfo": self.server_info
            }),
        )
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, request: &McpRequest) -> McpResponse {
        McpResponse::success(
            request.id.clone(),
            json!({ "tools": self.registry.definitions() }),
        )
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, request: &McpRequest) -> McpResponse {
        let name = match request.params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => {
                return McpResponse::error(
                    request.id.clone(),
                    error_codes::INVALID_PARAMS,
                    "missing tool name",
                );
            }
        };
        let arguments = request
            .params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        info!("Calling tool: {}", name);

        let result = match self.registry.execute(name, arguments).await {
            Ok(result) => result,
            Err(e) if e.is_caller_error() => {
                warn!("Rejected call to {}: {}", name, e);
                return McpResponse::error(
                    request.id.clone(),
                    error_codes::INVALID_PARAMS,
                    e.to_string(),
                );
            }
            Err(e) => {
                error!("Tool {} failed: {}", name, e);
                ToolCallResult::error(e.to_string())
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(request.id.clone(), value),
            Err(e) => McpResponse::error(
                request.id.clone(),
                error_codes::INTERNAL_ERROR,
                e.to_string(),
            ),
        }
    }

    fn handle_templates_list(&self, request: &McpRequest) -> McpResponse {
        McpResponse::success(
            request.id.clone(),
            json!({ "resourceTemplates": self.registry.resource_templates() }),
        )
    }

    fn handle_resources_read(&self, request: &McpRequest) -> McpResponse {
        let Some(uri) = request.params.get("uri").and_then(|v| v.as_str()) else {
            return McpResponse::error(
                request.id.clone(),
                error_codes::INVALID_PARAMS,
                "missing resource uri",
            );
        };

        match self.registry.read_resource(uri) {
            Ok(contents) => {
                McpResponse::success(request.id.clone(), json!({ "contents": [contents] }))
            }
            Err(e) => {
                let code = if e.is_caller_error() {
                    error_codes::INVALID_PARAMS
                } else {
                    error_codes::INTERNAL_ERROR
                };
                McpResponse::error(request.id.clone(), code, e.to_string())
            }
        }
    }

    /// Handle ping request.
    fn handle_ping(&self, request: &McpRequest) -> McpResponse {
        McpResponse::success(request.id.clone(), json!({}))
    }
}
