//! MCP 会话
//!
//! 一个会话只服务一个 HTTP 请求（单条消息或一个 batch），
//! 持有该请求专属的 `ToolSet`，响应生成后随请求一起销毁。

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, Instrument, Span};

use super::tool::{ToolCallError, ToolSet};
use super::types::{error_code, McpRequest, McpResponse};

/// 支持的协议版本，第一个为默认版本
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-03-26", "2024-11-05", "2025-06-18"];

/// 服务端信息（initialize 响应）
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "notification-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// 会话内部错误，由传输层转换为 -32603
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("tool {tool} failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("tool {0} panicked")]
    ToolPanicked(String),
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 单请求会话
#[derive(Debug)]
pub struct Session {
    tools: ToolSet,
    info: ServerInfo,
}

impl Session {
    pub fn new(tools: ToolSet, info: ServerInfo) -> Self {
        Self { tools, info }
    }

    /// 处理一条原始 JSON 消息
    ///
    /// 不是合法 JSON-RPC 请求时返回 -32600 响应；notification 返回 `None`。
    pub async fn handle_value(&self, message: Value) -> Result<Option<McpResponse>, SessionError> {
        let id = message.get("id").cloned().filter(|v| !v.is_null());
        let request: McpRequest = match serde_json::from_value(message) {
            Ok(req) => req,
            Err(e) => {
                return Ok(Some(McpResponse::error(
                    id,
                    error_code::INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                )))
            }
        };
        if request.jsonrpc != "2.0" {
            return Ok(Some(McpResponse::error(
                request.id,
                error_code::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )));
        }
        self.handle_request(request).await
    }

    /// 处理 MCP 请求
    pub async fn handle_request(&self, request: McpRequest) -> Result<Option<McpResponse>, SessionError> {
        if request.is_notification() {
            debug!("Received notification: {}", request.method);
            return Ok(None);
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => McpResponse::success(id, self.handle_initialize(request.params.as_ref())),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => McpResponse::success(id, serde_json::json!({ "tools": self.tools.list() })),
            "tools/call" => self.handle_tools_call(id, request.params).await?,
            other => McpResponse::method_not_found(id, other),
        };
        Ok(Some(response))
    }

    /// 处理 initialize
    fn handle_initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str());
        let version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

        serde_json::json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    /// 处理 tools/call
    ///
    /// 工具在独立任务中执行，panic 被转换为 `SessionError::ToolPanicked`。
    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Option<Value>,
    ) -> Result<McpResponse, SessionError> {
        let params = params.unwrap_or(Value::Null);
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None => return Ok(McpResponse::invalid_params(id, "Missing tool name")),
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let tool = match self.tools.get(&name) {
            Some(tool) => tool,
            None => return Ok(McpResponse::invalid_params(id, format!("Tool {} not found", name))),
        };

        info!("Calling tool: {}", name);
        let execution = tool.invoke(arguments).instrument(Span::current());
        let outcome = match tokio::spawn(execution).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Tool {} did not complete: {}", name, join_error);
                return Err(SessionError::ToolPanicked(name));
            }
        };

        match outcome {
            Ok(result) => {
                if result.is_error {
                    info!("Tool {} returned an error result", name);
                }
                Ok(McpResponse::success(id, serde_json::to_value(result)?))
            }
            Err(ToolCallError::InvalidParams(message)) => Ok(McpResponse::invalid_params(
                id,
                format!("Invalid arguments for tool {}: {}", name, message),
            )),
            Err(ToolCallError::Internal(source)) => Err(SessionError::ToolFailed { tool: name, source }),
        }
    }
}
