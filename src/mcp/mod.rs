//! MCP 协议层：类型、工具集、会话

pub mod registry;
pub mod session;
pub mod tool;
pub mod tools;
pub mod types;

pub use registry::build_toolset;
pub use session::{ServerInfo, Session, SessionError, SUPPORTED_PROTOCOL_VERSIONS};
pub use tool::{parse_args, ToolCallError, ToolDescriptor, ToolFuture, ToolSet};
pub use types::{error_code, Content, McpError, McpRequest, McpResponse, McpTool, ToolResponse};
