use crate::error::{Result, TarvenError};
use crate::mcp::registry::OperationRegistry;
use crate::mcp::types::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server exposing whatever operations are currently registered
pub struct McpServer {
    registry: Arc<OperationRegistry>,
}

impl McpServer {
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Process one JSON-RPC request (transport-agnostic)
    ///
    /// Returns `Ok(None)` for notifications. Handler failures come back as
    /// JSON-RPC error responses, never as `Err`.
    pub async fn process_mcp_request(
        &self,
        request: JsonRpcRequest,
        initialized: &mut bool,
    ) -> Result<Option<JsonRpcResponse>> {
        let id = match &request.id {
            Some(id) => id.clone(),
            None => {
                if request.method == "notifications/initialized" {
                    *initialized = true;
                }
                return Ok(None);
            }
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(&id, &request.params),
            "tools/list" => self.handle_tools_list(&id),
            "tools/call" => self.handle_tools_call(&id, &request.params).await,
            "shutdown" => Ok(success(&id, Value::Null)),
            "ping" => Ok(success(&id, json!({}))),
            _ => Ok(failure(
                &id,
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            )),
        };

        Ok(Some(response.unwrap_or_else(|e| JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: id.into(),
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError {
                    code: error_codes::INTERNAL_ERROR,
                    message: format!("Internal error: {}", e),
                    data: Some(json!({ "details": e.to_string() })),
                },
            },
        })))
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout until EOF
    pub async fn run(&self) -> Result<()> {
        let mut stdin = AsyncBufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut line = String::new();
        let mut initialized = false;

        log::info!(
            "tarvenote MCP server v{} on stdio ({} tools registered)",
            env!("CARGO_PKG_VERSION"),
            self.registry.len()
        );

        loop {
            line.clear();
            if stdin.read_line(&mut line).await? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(request) => request,
                Err(e) => {
                    log::warn!("Unparseable request: {}", e);
                    if let Some(id) = extract_id_from_line(trimmed) {
                        let response = JsonRpcResponse {
                            jsonrpc: "2.0".to_string(),
                            id,
                            payload: JsonRpcResponsePayload::Error {
                                error: JsonRpcError {
                                    code: error_codes::PARSE_ERROR,
                                    message: format!("Parse error: {}", e),
                                    data: None,
                                },
                            },
                        };
                        send_response(&mut stdout, &response).await?;
                    }
                    continue;
                }
            };

            match self.process_mcp_request(request, &mut initialized).await? {
                Some(response) => send_response(&mut stdout, &response).await?,
                None if initialized => log::debug!("Client initialized"),
                None => {}
            }
        }

        log::info!("MCP server shutting down");
        Ok(())
    }

    fn handle_initialize(&self, id: &JsonRpcId, params: &Option<Value>) -> Result<JsonRpcResponse> {
        let params: InitializeParams =
            serde_json::from_value(params.clone().unwrap_or_else(|| json!({})))
                .map_err(|e| TarvenError::McpProtocol(format!("Invalid initialize params: {}", e)))?;
        match &params.client_info {
            Some(client) => log::info!(
                "initialize from {} {} (protocol {})",
                client.name,
                client.version.as_deref().unwrap_or("?"),
                params.protocol_version
            ),
            None => log::debug!("initialize (client protocol {})", params.protocol_version),
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: ServerInfo {
                name: "tarvenote".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        Ok(success(id, to_value(&result)?))
    }

    fn handle_tools_list(&self, id: &JsonRpcId) -> Result<JsonRpcResponse> {
        let result = ToolsListResult {
            tools: self.registry.tool_definitions(),
        };
        Ok(success(id, to_value(&result)?))
    }

    async fn handle_tools_call(&self, id: &JsonRpcId, params: &Option<Value>) -> Result<JsonRpcResponse> {
        let params = match params.clone().map(serde_json::from_value::<ToolsCallParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Ok(failure(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                ))
            }
            None => {
                return Ok(failure(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing params for tools/call".to_string(),
                ))
            }
        };

        let arguments = match params.arguments {
            Value::Null => json!({}),
            other => other,
        };
        let Some(envelope) = self.registry.invoke(&params.name, arguments).await else {
            return Ok(failure(
                id,
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        };

        let result = ToolsCallResult {
            is_error: envelope_failed(&envelope).then_some(true),
            content: vec![ContentItem::text(envelope)],
        };
        Ok(success(id, to_value(&result)?))
    }
}

/// True when an envelope string reports `success: false`.
fn envelope_failed(envelope: &str) -> bool {
    serde_json::from_str::<Value>(envelope)
        .ok()
        .and_then(|v| v.get("success").and_then(Value::as_bool))
        == Some(false)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| TarvenError::McpProtocol(format!("JSON serialization error: {}", e)))
}

fn success(id: &JsonRpcId, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: id.clone().into(),
        payload: JsonRpcResponsePayload::Result { result },
    }
}

fn failure(id: &JsonRpcId, code: i32, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: id.clone().into(),
        payload: JsonRpcResponsePayload::Error {
            error: JsonRpcError {
                code,
                message,
                data: None,
            },
        },
    }
}

/// Write one response line and flush
async fn send_response(stdout: &mut tokio::io::Stdout, response: &JsonRpcResponse) -> Result<()> {
    let mut json = serde_json::to_string(response)
        .map_err(|e| TarvenError::McpProtocol(format!("JSON serialization error: {}", e)))?;
    json.push('\n');
    stdout.write_all(json.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Best-effort `id` recovery from a line that failed to parse
fn extract_id_from_line(line: &str) -> Option<Value> {
    let rest = &line[line.find("\"id\"")? + 4..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some(Value::String(quoted[..end].to_string()));
    }
    let end = rest.find(|c: char| c == ',' || c == '}').unwrap_or(rest.len());
    rest[..end].trim().parse::<i64>().ok().map(Value::from)
}
