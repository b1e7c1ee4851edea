//! Notification MCP - 按请求隔离凭证的 MCP 通知服务

pub mod auth;
pub mod clients;
pub mod config;
pub mod http;
pub mod mcp;

pub use auth::{mask_key, AuthPolicy, Credential, CredentialBundle, CredentialKind, Enforcement};
pub use clients::{CollaboratorError, Collaborators};
pub use config::ServerConfig;
pub use http::{router, serve, AppState, ToolsetFactory};
pub use mcp::{build_toolset, ServerInfo, Session, SessionError, ToolResponse, ToolSet};
