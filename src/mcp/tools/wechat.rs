//! wechat-message-push 工具（ServerChan）

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::Credential;
use crate::clients::{CollaboratorError, ServerChanClient};
use crate::mcp::tool::{parse_args, ToolCallError, ToolDescriptor};
use crate::mcp::types::ToolResponse;

pub const NAME: &str = "wechat-message-push";

pub const MISSING_KEY_MESSAGE: &str =
    "Error: ServerChan API key (scKey) is missing or invalid for this request.";

#[derive(Debug, Deserialize)]
pub struct WechatPushArgs {
    pub title: String,
    pub description: String,
}

pub fn descriptor(client: ServerChanClient, credential: Credential) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Push a wechat message",
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"}
            },
            "required": ["title", "description"]
        }),
        move |arguments: Value| {
            let client = client.clone();
            let credential = credential.clone();
            async move { call(&client, &credential, arguments).await }
        },
    )
}

async fn call(
    client: &ServerChanClient,
    credential: &Credential,
    arguments: Value,
) -> Result<ToolResponse, ToolCallError> {
    let args: WechatPushArgs = parse_args(arguments)?;

    if !credential.is_valid() {
        warn!("wechat-message-push tool called without valid scKey: {}", credential.masked());
        return Ok(ToolResponse::error(MISSING_KEY_MESSAGE));
    }

    let response = match client.push(credential.expose(), &args.title, &args.description).await {
        Ok(resp) if resp.is_success() => ToolResponse::text(format!(
            "WeChat notification sent successfully. Message: {}",
            resp.message
        )),
        Ok(resp) => ToolResponse::error(format!(
            "Failed to send WeChat notification. Error: {} (Code: {})",
            resp.message, resp.code
        )),
        Err(CollaboratorError::InvalidResponse(_)) => {
            ToolResponse::error("Invalid response format from ServerChan API")
        }
        Err(e) => ToolResponse::error(format!("Error sending wechat notification: {}", e)),
    };
    Ok(response)
}
