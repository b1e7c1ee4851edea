//! Plunk 邮件 API 客户端

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{build_http_client, status_error, CollaboratorError, DEFAULT_TIMEOUT_SECS};
use crate::auth::mask_key;

/// Plunk API 基础 URL
pub const PLUNK_API_URL: &str = "https://api.useplunk.com";

/// Plunk 客户端配置
#[derive(Debug, Clone)]
pub struct PlunkConfig {
    /// API 基础 URL（测试时可指向本地 stub）
    pub base_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for PlunkConfig {
    fn default() -> Self {
        Self {
            base_url: PLUNK_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `/v1/send` 请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Plunk 客户端
#[derive(Debug, Clone)]
pub struct PlunkClient {
    client: Client,
    config: PlunkConfig,
}

impl PlunkClient {
    pub fn new(config: PlunkConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// 发送邮件，2xx 视为成功
    pub async fn send(&self, api_key: &str, email: &EmailRequest) -> Result<(), CollaboratorError> {
        let url = format!("{}/v1/send", self.config.base_url.trim_end_matches('/'));
        info!("Sending email for key {} to {}", mask_key(api_key), email.to);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(email)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!("Plunk API error for key {}: {}", mask_key(api_key), err);
            return Err(err);
        }

        info!("Email successfully sent for key {} to {}", mask_key(api_key), email.to);
        Ok(())
    }
}
