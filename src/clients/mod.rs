//! 第三方服务客户端
//!
//! 客户端只持有连接池和 base URL，不持有任何 API key；
//! key 由工具在每次调用时传入，因此客户端可以在请求之间共享。

pub mod keywords;
pub mod plunk;
pub mod serverchan;

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use thiserror::Error;

pub use keywords::{KeywordsClient, KeywordsConfig, KeywordsQuery, KeywordsResponse};
pub use plunk::{EmailRequest, PlunkClient, PlunkConfig};
pub use serverchan::{ServerChanClient, ServerChanConfig, ServerChanResponse};

/// 默认超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 第三方调用失败
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// 网络错误或无法读取响应
    #[error("{0}")]
    Network(String),
    /// 非 2xx 状态码
    #[error("{status} {reason} - {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
    /// 响应结构不符合预期
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// 构建带超时的 HTTP 客户端
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))
}

/// 将非 2xx 响应转换为 `CollaboratorError::Status`
pub(crate) async fn status_error(response: reqwest::Response) -> CollaboratorError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    CollaboratorError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        body,
    }
}

/// 所有工具共享的客户端集合
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub email: PlunkClient,
    pub wechat: ServerChanClient,
    pub keywords: KeywordsClient,
}

impl Collaborators {
    pub fn new(
        plunk: PlunkConfig,
        serverchan: ServerChanConfig,
        keywords: KeywordsConfig,
    ) -> Result<Self> {
        Ok(Self {
            email: PlunkClient::new(plunk)?,
            wechat: ServerChanClient::new(serverchan)?,
            keywords: KeywordsClient::new(keywords)?,
        })
    }
}
