//! MCP 类型定义
//!
//! JSON-RPC 信封、错误码和工具结果结构。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON-RPC 错误码
pub mod error_code {
    /// 请求体不是合法 JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// 不是合法的 JSON-RPC 请求
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// HTTP 方法不被允许（GET / DELETE）
    pub const METHOD_NOT_ALLOWED: i32 = -32000;
    /// 缺少或无效的 API key
    pub const UNAUTHORIZED: i32 = -32001;
}

/// MCP 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    /// 没有 id 字段的消息是 notification，不需要响应；`"id": null` 仍需响应
    #[serde(default, deserialize_with = "present_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// 字段存在即为 `Some`，包括 `null`
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl McpRequest {
    /// 构造带 id 的请求
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// 是否为 notification
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// MCP 响应
///
/// `id` 总是序列化，无 id 时输出 `null`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

/// MCP 错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

/// MCP 工具定义（tools/list 输出项）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl McpResponse {
    /// 创建成功响应
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: id.unwrap_or(Value::Null),
        }
    }

    /// 创建错误响应
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
            }),
            id: id.unwrap_or(Value::Null),
        }
    }

    /// 创建方法未找到错误
    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, error_code::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    /// 创建参数错误
    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, error_code::INVALID_PARAMS, message)
    }

    /// 创建内部错误
    pub fn internal_error(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, error_code::INTERNAL_ERROR, message)
    }
}

/// 工具结果内容块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// 工具调用结果：`{ content: [{type: "text", text}], isError }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    /// 成功结果
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// 工具级错误结果（不是 JSON-RPC 错误）
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// 第一个文本块的内容
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().map(|c| match c {
            Content::Text { text } => text.as_str(),
        }).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp_request_deserialize() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#;
        let request: McpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.method, "tools/list");
        assert_eq!(request.jsonrpc, "2.0");
        assert!(!request.is_notification());
    }

    #[test]
    fn test_notification_has_no_id() {
        let json = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let request: McpRequest = serde_json::from_str(json).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let json = r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#;
        let request: McpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, Some(Value::Null));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_error_response_serializes_null_id() {
        let response = McpResponse::error(None, error_code::METHOD_NOT_ALLOWED, "Method not allowed.");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "Method not allowed."},
                "id": null
            })
        );
    }

    #[test]
    fn test_success_response_omits_error() {
        let response = McpResponse::success(Some(serde_json::json!("abc")), serde_json::json!({}));
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn test_tool_response_shape() {
        let value = serde_json::to_value(ToolResponse::text("Tool echo: hi")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "content": [{"type": "text", "text": "Tool echo: hi"}],
                "isError": false
            })
        );

        let value = serde_json::to_value(ToolResponse::error("boom")).unwrap();
        assert_eq!(value["isError"], true);
    }

    #[test]
    fn test_mcp_tool_serialize() {
        let tool = McpTool {
            name: "echo".to_string(),
            description: "Echoes back the provided message".to_string(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("inputSchema"));
    }
}
