//! ServerChan（Server酱）微信推送客户端
//!
//! 请求地址由 key 决定：
//! - `sctp<N>t...` 形式的 key 发往 `https://<N>.push.ft07.com/send/<key>.send`
//! - 其余 key 发往 `https://sctapi.ftqq.com/<key>.send`
//!
//! 配置了 `base_url` 时一律发往 `<base_url>/<key>.send`。

use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::{build_http_client, CollaboratorError, DEFAULT_TIMEOUT_SECS};
use crate::auth::mask_key;

/// ServerChan Turbo 默认地址
pub const SERVERCHAN_API_URL: &str = "https://sctapi.ftqq.com";

fn sctp_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^sctp(\d+)t").expect("valid sctp key pattern"))
}

/// ServerChan 客户端配置
#[derive(Debug, Clone)]
pub struct ServerChanConfig {
    /// 覆盖默认地址（测试或私有部署）
    pub base_url: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for ServerChanConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// 推送请求体
#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    title: &'a str,
    desp: &'a str,
}

/// ServerChan 响应：`{code, message}`，其余字段忽略
#[derive(Debug, Clone, Deserialize)]
pub struct ServerChanResponse {
    pub code: i64,
    pub message: String,
}

impl ServerChanResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// ServerChan 客户端
#[derive(Debug, Clone)]
pub struct ServerChanClient {
    client: Client,
    config: ServerChanConfig,
}

impl ServerChanClient {
    pub fn new(config: ServerChanConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// 根据 key 计算推送地址
    pub fn endpoint(&self, key: &str) -> String {
        if let Some(base) = &self.config.base_url {
            return format!("{}/{}.send", base.trim_end_matches('/'), key);
        }
        match sctp_key_pattern().captures(key) {
            Some(caps) => format!("https://{}.push.ft07.com/send/{}.send", &caps[1], key),
            None => format!("{}/{}.send", SERVERCHAN_API_URL, key),
        }
    }

    /// 推送消息
    ///
    /// ServerChan 在失败时同样返回 JSON 体，因此不按 HTTP 状态码判断，
    /// 只校验响应结构；`code != 0` 由调用方处理。
    pub async fn push(
        &self,
        api_key: &str,
        title: &str,
        description: &str,
    ) -> Result<ServerChanResponse, CollaboratorError> {
        let url = self.endpoint(api_key);
        let response = self
            .client
            .post(&url)
            .json(&PushRequest { title, desp: description })
            .send()
            .await?;

        let body: Value = response.json().await?;
        let parsed: ServerChanResponse = serde_json::from_value(body.clone()).map_err(|e| {
            error!("Invalid ServerChan API response format: {}", body);
            CollaboratorError::InvalidResponse(e.to_string())
        })?;

        if parsed.is_success() {
            info!("ServerChan notification successful for key {}", mask_key(api_key));
        } else {
            error!(
                "ServerChan notification failed for key {} Code: {}, Message: {}",
                mask_key(api_key),
                parsed.code,
                parsed.message
            );
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: Option<&str>) -> ServerChanClient {
        ServerChanClient::new(ServerChanConfig {
            base_url: base_url.map(|s| s.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_for_turbo_key() {
        assert_eq!(
            client(None).endpoint("SCT12345abc"),
            "https://sctapi.ftqq.com/SCT12345abc.send"
        );
    }

    #[test]
    fn test_endpoint_for_sctp_key() {
        assert_eq!(
            client(None).endpoint("sctp42tABCDEF"),
            "https://42.push.ft07.com/send/sctp42tABCDEF.send"
        );
    }

    #[test]
    fn test_endpoint_with_base_url_override() {
        assert_eq!(
            client(Some("http://127.0.0.1:9000/")).endpoint("SCT1"),
            "http://127.0.0.1:9000/SCT1.send"
        );
    }

    #[test]
    fn test_response_shape() {
        let ok: ServerChanResponse =
            serde_json::from_str(r#"{"code":0,"message":"","data":{"pushid":"1"}}"#).unwrap();
        assert!(ok.is_success());

        let missing_message = serde_json::from_str::<ServerChanResponse>(r#"{"code":0}"#);
        assert!(missing_message.is_err());

        let wrong_type = serde_json::from_str::<ServerChanResponse>(r#"{"code":"0","message":"x"}"#);
        assert!(wrong_type.is_err());
    }
}
