//! KeywordsEverywhere API 客户端

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{build_http_client, status_error, CollaboratorError, DEFAULT_TIMEOUT_SECS};

/// KeywordsEverywhere API 基础 URL
pub const KEYWORDS_API_URL: &str = "https://api.keywordseverywhere.com";

/// KeywordsEverywhere 客户端配置
#[derive(Debug, Clone)]
pub struct KeywordsConfig {
    pub base_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            base_url: KEYWORDS_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// 查询参数
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordsQuery {
    pub keywords: Vec<String>,
    pub country: String,
    pub currency: String,
    pub data_source: String,
}

impl KeywordsQuery {
    /// 表单参数：每个关键词一个 `kw[]`，国家和货币转小写
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = self
            .keywords
            .iter()
            .map(|k| ("kw[]", k.clone()))
            .collect();
        params.push(("country", self.country.to_lowercase()));
        params.push(("currency", self.currency.to_lowercase()));
        params.push(("dataSource", self.data_source.clone()));
        params
    }
}

/// CPC 值
#[derive(Debug, Clone, Deserialize)]
pub struct Cpc {
    pub currency: String,
    /// API 返回字符串，个别情况下是数字
    pub value: Value,
}

/// 趋势条目，字段类型不稳定，保留原始值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendEntry {
    #[serde(default)]
    pub month: Value,
    #[serde(default)]
    pub year: Value,
    #[serde(default)]
    pub value: Value,
}

/// 单个关键词的数据
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordItem {
    pub keyword: String,
    #[serde(default)]
    pub vol: Option<i64>,
    #[serde(default)]
    pub cpc: Option<Cpc>,
    #[serde(default)]
    pub competition: Option<f64>,
    #[serde(default)]
    pub trend: Option<Vec<TrendEntry>>,
}

/// `/v1/get_keyword_data` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsResponse {
    #[serde(default)]
    pub data: Vec<KeywordItem>,
    pub credits: f64,
    pub credits_consumed: f64,
    pub time: f64,
}

impl KeywordsResponse {
    /// 按关键词查找（不区分大小写）
    pub fn find(&self, keyword: &str) -> Option<&KeywordItem> {
        let needle = keyword.to_lowercase();
        self.data.iter().find(|item| item.keyword.to_lowercase() == needle)
    }
}

/// KeywordsEverywhere 客户端
#[derive(Debug, Clone)]
pub struct KeywordsClient {
    client: Client,
    config: KeywordsConfig,
}

impl KeywordsClient {
    pub fn new(config: KeywordsConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// 查询关键词数据
    pub async fn keyword_data(
        &self,
        api_key: &str,
        query: &KeywordsQuery,
    ) -> Result<KeywordsResponse, CollaboratorError> {
        let url = format!(
            "{}/v1/get_keyword_data",
            self.config.base_url.trim_end_matches('/')
        );
        let params = query.form_params();
        debug!("Sending KE request with {} keywords", query.keywords.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        info!("KE API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response.json().await?;
        let parsed: KeywordsResponse = serde_json::from_value(body)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;

        info!(
            "KE API credits consumed: {}, remaining: {}",
            parsed.credits_consumed, parsed.credits
        );
        Ok(parsed)
    }
}
