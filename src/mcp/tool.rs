//! 工具描述与工具集
//!
//! `ToolDescriptor` 把名称、描述、输入 schema 和一个异步执行闭包绑在一起。
//! 闭包在构造时捕获自己需要的凭证和客户端，之后只接收调用参数。

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::types::{McpTool, ToolResponse};

/// 工具执行失败（区别于工具级错误结果 `isError: true`）
#[derive(Debug, Error)]
pub enum ToolCallError {
    /// 参数不符合 schema，返回 JSON-RPC -32602
    #[error("{0}")]
    InvalidParams(String),
    /// 内部错误，由会话边界转换为 -32603
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// 工具执行的 future
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolResponse, ToolCallError>> + Send>>;

type Handler = Box<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// 单个工具
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: Value,
    handler: Handler,
}

impl ToolDescriptor {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse, ToolCallError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Box::new(move |args| -> ToolFuture { Box::pin(handler(args)) }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// 生成执行 future；future 不借用 descriptor
    pub fn invoke(&self, arguments: Value) -> ToolFuture {
        (self.handler)(arguments)
    }

    /// tools/list 中的描述
    pub fn to_mcp_tool(&self) -> McpTool {
        McpTool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// 单个请求的工具集，按注册顺序保存
#[derive(Debug, Default)]
pub struct ToolSet {
    tools: Vec<ToolDescriptor>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换
    pub fn register(&mut self, tool: ToolDescriptor) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn list(&self) -> Vec<McpTool> {
        self.tools.iter().map(ToolDescriptor::to_mcp_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// 把调用参数解析为类型化结构；缺省参数视为 `{}`
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidParams(e.to_string()))
}
