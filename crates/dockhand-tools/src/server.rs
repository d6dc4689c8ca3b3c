//! Line-delimited JSON-RPC 2.0 server for the tool surface.
//!
//! Speaks the tool subset of the Model Context Protocol: `initialize`,
//! `ping`, `tools/list` and `tools/call`. One request per line in, one
//! response per line out; notifications get no reply. Requests are handled
//! in order against a single [`HubTools`], so every call shares one cache.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::definition::definitions;
use crate::tools::HubTools;

/// Protocol revision announced when the client does not name one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "dockhand";

const JSONRPC_VERSION: &str = "2.0";
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_value(&self) -> Value {
        json!({ "code": self.code, "message": self.message })
    }
}

/// Serves tool calls over a line-delimited JSON-RPC stream.
#[derive(Debug, Clone)]
pub struct ToolServer {
    tools: HubTools,
}

impl ToolServer {
    /// Creates a server dispatching to `tools`.
    #[must_use]
    pub const fn new(tools: HubTools) -> Self {
        Self { tools }
    }

    /// Returns the tool dispatcher.
    #[must_use]
    pub const fn tools(&self) -> &HubTools {
        &self.tools
    }

    /// Reads requests from `reader` until end of input, writing each
    /// response as one line to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails. Malformed requests
    /// are answered with a JSON-RPC error instead.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Tool server ready");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        info!("Input closed, tool server stopping");
        Ok(())
    }

    /// Handles one request line and returns the response line, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unparseable request");
                let error = RpcError::new(PARSE_ERROR, format!("Parse error: {e}"));
                return Some(reply(Value::Null, Err(error)));
            }
        };
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let error = RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}"));
                return Some(reply(Value::Null, Err(error)));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        debug!(method = %request.method, "Request received");
        let result = self.dispatch(&request.method, request.params).await;
        Some(reply(id, result))
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let tools = serde_json::to_value(definitions())
                    .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;
                Ok(json!({ "tools": tools }))
            }
            "tools/call" => {
                let params: CallParams = serde_json::from_value(params).map_err(|e| {
                    RpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {e}"))
                })?;
                let output = self.tools.call(&params.name, params.arguments).await;
                Ok(json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error,
                }))
            }
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

fn reply(id: Value, result: Result<Value, RpcError>) -> String {
    let response = match result {
        Ok(result) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error.to_value() }),
    };
    response.to_string()
}
