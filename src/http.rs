//! HTTP 传输层
//!
//! `POST /mcp` 的处理流程：解析请求体 -> 提取凭证 -> 请求层校验 ->
//! 构建本请求专属的工具集和会话 -> 分发。会话在响应返回后销毁。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::auth::{mask_key, AuthPolicy, CredentialBundle, CredentialKind, Enforcement};
use crate::clients::Collaborators;
use crate::config::ServerConfig;
use crate::mcp::{
    build_toolset, error_code, McpResponse, ServerInfo, Session, SessionError, ToolSet,
};

/// 每个请求调用一次的工具集工厂
pub type ToolsetFactory = Arc<dyn Fn(&CredentialBundle, &Collaborators) -> ToolSet + Send + Sync>;

/// 所有请求共享的只读状态
pub struct AppState {
    collaborators: Collaborators,
    policy: AuthPolicy,
    toolset: ToolsetFactory,
    seq: AtomicU64,
}

impl AppState {
    pub fn new(collaborators: Collaborators, policy: AuthPolicy) -> Self {
        Self::with_toolset(collaborators, policy, Arc::new(build_toolset))
    }

    /// 使用自定义工具集工厂
    pub fn with_toolset(
        collaborators: Collaborators,
        policy: AuthPolicy,
        toolset: ToolsetFactory,
    ) -> Self {
        Self {
            collaborators,
            policy,
            toolset,
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("collaborators", &self.collaborators)
            .field("policy", &self.policy)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route(
            "/mcp",
            post(handle_mcp).get(method_not_allowed).delete(method_not_allowed),
        )
        .with_state(state)
}

/// 启动 HTTP 服务，Ctrl+C 时优雅退出
pub async fn serve(config: ServerConfig) -> Result<()> {
    let collaborators = config.collaborators()?;
    let state = Arc::new(AppState::new(collaborators, config.auth));
    let bind_addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!(
        "MCP server listening on http://{}/mcp (auth: send={}, notify={}, keywords={})",
        bind_addr,
        enforcement_name(&config.auth, CredentialKind::Send),
        enforcement_name(&config.auth, CredentialKind::Notify),
        enforcement_name(&config.auth, CredentialKind::Keywords),
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("HTTP server error: {}", e))?;

    info!("MCP server stopped");
    Ok(())
}

fn enforcement_name(policy: &AuthPolicy, kind: CredentialKind) -> &'static str {
    match policy.enforcement(kind) {
        Enforcement::Request => "request",
        Enforcement::Tool => "tool",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "MCP Notification Server is running"
    }))
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "notification-mcp",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn method_not_allowed() -> Response {
    json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        None,
        error_code::METHOD_NOT_ALLOWED,
        "Method not allowed.",
    )
}

async fn handle_mcp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let seq = state.next_seq();
    process_mcp(state, headers, body)
        .instrument(info_span!("mcp_request", seq))
        .await
}

async fn process_mcp(state: Arc<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return json_error(
                StatusCode::BAD_REQUEST,
                None,
                error_code::PARSE_ERROR,
                format!("Parse error: {}", e),
            );
        }
    };

    let credentials = CredentialBundle::from_headers(&headers);
    debug!("Extracted credentials: {:?}", credentials);

    if let Err(kind) = state.policy.authorize(&credentials) {
        warn!(
            "Unauthorized request: invalid or missing {} key ({})",
            kind,
            mask_key(credentials.get(kind))
        );
        return json_error(
            StatusCode::UNAUTHORIZED,
            request_id(&payload),
            error_code::UNAUTHORIZED,
            format!("Unauthorized: Invalid or missing {} API key", kind.label()),
        );
    }

    let session = Session::new(
        (state.toolset)(&credentials, &state.collaborators),
        ServerInfo::default(),
    );

    match payload {
        Value::Array(messages) => handle_batch(&session, messages).await,
        message => handle_single(&session, message).await,
    }
}

async fn handle_single(session: &Session, message: Value) -> Response {
    let id = request_id(&message);
    match session.handle_value(message).await {
        Ok(Some(response)) => {
            let status = match &response.error {
                Some(e) if e.code == error_code::INVALID_REQUEST => StatusCode::BAD_REQUEST,
                _ => StatusCode::OK,
            };
            (status, Json(response)).into_response()
        }
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => internal_error(id, &e),
    }
}

async fn handle_batch(session: &Session, messages: Vec<Value>) -> Response {
    if messages.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            None,
            error_code::INVALID_REQUEST,
            "Invalid Request: empty batch",
        );
    }

    let mut responses = Vec::with_capacity(messages.len());
    for message in messages {
        match session.handle_value(message).await {
            Ok(Some(response)) => responses.push(response),
            Ok(None) => {}
            Err(e) => return internal_error(None, &e),
        }
    }

    if responses.is_empty() {
        StatusCode::ACCEPTED.into_response()
    } else {
        Json(responses).into_response()
    }
}

fn internal_error(id: Option<Value>, e: &SessionError) -> Response {
    error!("Error handling MCP request: {}", e);
    let response = McpResponse::internal_error(id, "Internal server error while processing request");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
}

fn json_error(status: StatusCode, id: Option<Value>, code: i32, message: impl Into<String>) -> Response {
    (status, Json(McpResponse::error(id, code, message))).into_response()
}

/// 请求体中的 id；batch 或无 id 时为 `None`
fn request_id(payload: &Value) -> Option<Value> {
    payload.get("id").cloned().filter(|id| !id.is_null())
}
