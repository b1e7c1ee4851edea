//! echo 工具

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::tool::{parse_args, ToolCallError, ToolDescriptor};
use crate::mcp::types::ToolResponse;

pub const NAME: &str = "echo";

#[derive(Debug, Deserialize)]
pub struct EchoArgs {
    pub message: String,
}

pub fn echo(args: &EchoArgs) -> ToolResponse {
    ToolResponse::text(format!("Tool echo: {}", args.message))
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Echoes back the provided message",
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {"type": "string"}
            },
            "required": ["message"]
        }),
        |arguments: Value| async move { call(arguments) },
    )
}

fn call(arguments: Value) -> Result<ToolResponse, ToolCallError> {
    let args: EchoArgs = parse_args(arguments)?;
    Ok(echo(&args))
}
