//! send-email 工具（Plunk）

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::Credential;
use crate::clients::{CollaboratorError, EmailRequest, PlunkClient};
use crate::mcp::tool::{parse_args, ToolCallError, ToolDescriptor};
use crate::mcp::types::ToolResponse;

pub const NAME: &str = "send-email";

pub const MISSING_KEY_MESSAGE: &str =
    "Error: Plunk API key (sendKey) is missing or invalid for this request.";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

#[derive(Debug, Deserialize)]
pub struct EmailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailArgs {
    pub fn validate(&self) -> Result<(), ToolCallError> {
        if !email_pattern().is_match(&self.to) {
            return Err(ToolCallError::InvalidParams("to: Must be a valid email address".to_string()));
        }
        if self.subject.is_empty() {
            return Err(ToolCallError::InvalidParams("subject: Subject cannot be empty".to_string()));
        }
        if self.body.is_empty() {
            return Err(ToolCallError::InvalidParams("body: Email body cannot be empty".to_string()));
        }
        Ok(())
    }
}

pub fn descriptor(client: PlunkClient, credential: Credential) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Send an email",
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {"type": "string", "format": "email"},
                "subject": {"type": "string", "minLength": 1},
                "body": {"type": "string", "minLength": 1}
            },
            "required": ["to", "subject", "body"]
        }),
        move |arguments: Value| {
            let client = client.clone();
            let credential = credential.clone();
            async move { call(&client, &credential, arguments).await }
        },
    )
}

async fn call(
    client: &PlunkClient,
    credential: &Credential,
    arguments: Value,
) -> Result<ToolResponse, ToolCallError> {
    let args: EmailArgs = parse_args(arguments)?;
    args.validate()?;

    if !credential.is_valid() {
        warn!("send-email tool called without valid sendKey: {}", credential.masked());
        return Ok(ToolResponse::error(MISSING_KEY_MESSAGE));
    }

    let request = EmailRequest {
        to: args.to,
        subject: args.subject,
        body: args.body,
    };

    let response = match client.send(credential.expose(), &request).await {
        Ok(()) => ToolResponse::text("Email sent successfully"),
        Err(CollaboratorError::Status { reason, .. }) => {
            ToolResponse::error(format!("Failed to send email: {}", reason))
        }
        Err(e) => ToolResponse::error(format!("An error occurred during email sending: {}", e)),
    };
    Ok(response)
}
