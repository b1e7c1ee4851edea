//! 凭证提取与校验
//!
//! 每个请求从 header 中提取 API key，组成一次性的 `CredentialBundle`。
//! 校验规则是纯函数；在哪一层校验由 `AuthPolicy` 按凭证种类决定：
//! - `Enforcement::Request`：请求入口统一校验，失败返回 401 / -32001
//! - `Enforcement::Tool`：工具调用时校验，失败返回 `isError: true`

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// 凭证种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Plunk 邮件 key（`mcp-send-key`）
    Send,
    /// ServerChan 微信推送 key（`mcp-sc-key`）
    Notify,
    /// KeywordsEverywhere key（`mcp-ke-key`）
    Keywords,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 3] = [Self::Send, Self::Notify, Self::Keywords];

    /// 对应的请求 header 名
    pub fn header_name(self) -> &'static str {
        match self {
            Self::Send => "mcp-send-key",
            Self::Notify => "mcp-sc-key",
            Self::Keywords => "mcp-ke-key",
        }
    }

    /// 错误信息中使用的名称
    pub fn label(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Notify => "ServerChan",
            Self::Keywords => "KeywordsEverywhere",
        }
    }

    /// 格式校验，空字符串总是无效
    pub fn is_valid(self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match self {
            Self::Send => key.starts_with("sk_"),
            Self::Notify => key.starts_with("SC"),
            Self::Keywords => key.chars().count() > 10,
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Send => "send",
            Self::Notify => "notify",
            Self::Keywords => "keywords",
        };
        f.write_str(name)
    }
}

/// 日志中只显示 key 的前 4 个字符
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "MISSING".to_string();
    }
    let prefix: String = key.chars().take(4).collect();
    format!("{}...", prefix)
}

/// 单个凭证，工具闭包只捕获它需要的这一个
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    kind: CredentialKind,
    key: String,
}

impl Credential {
    pub fn new(kind: CredentialKind, key: impl Into<String>) -> Self {
        Self { kind, key: key.into() }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// 原始 key；仅用于 outbound 请求
    pub fn expose(&self) -> &str {
        &self.key
    }

    pub fn is_valid(&self) -> bool {
        self.kind.is_valid(&self.key)
    }

    pub fn masked(&self) -> String {
        mask_key(&self.key)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("key", &self.masked())
            .finish()
    }
}

/// 单个请求的凭证集合
///
/// 缺失的 header 对应空字符串，不用 `Option`。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBundle {
    send: String,
    notify: String,
    keywords: String,
}

impl CredentialBundle {
    /// 从请求 header 中提取；非 UTF-8 的值视为缺失
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |kind: CredentialKind| {
            headers
                .get(kind.header_name())
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        Self {
            send: read(CredentialKind::Send),
            notify: read(CredentialKind::Notify),
            keywords: read(CredentialKind::Keywords),
        }
    }

    /// 设置某一种凭证（测试和非 HTTP 调用方使用）
    pub fn with(mut self, kind: CredentialKind, key: impl Into<String>) -> Self {
        *self.slot_mut(kind) = key.into();
        self
    }

    pub fn get(&self, kind: CredentialKind) -> &str {
        match kind {
            CredentialKind::Send => &self.send,
            CredentialKind::Notify => &self.notify,
            CredentialKind::Keywords => &self.keywords,
        }
    }

    /// 取出单个凭证的副本
    pub fn credential(&self, kind: CredentialKind) -> Credential {
        Credential::new(kind, self.get(kind))
    }

    fn slot_mut(&mut self, kind: CredentialKind) -> &mut String {
        match kind {
            CredentialKind::Send => &mut self.send,
            CredentialKind::Notify => &mut self.notify,
            CredentialKind::Keywords => &mut self.keywords,
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("send", &mask_key(&self.send))
            .field("notify", &mask_key(&self.notify))
            .field("keywords", &mask_key(&self.keywords))
            .finish()
    }
}

/// 凭证校验点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// 请求入口校验（401）
    Request,
    /// 工具调用时校验（isError）
    Tool,
}

impl FromStr for Enforcement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "tool" => Ok(Self::Tool),
            other => Err(anyhow!("未知的校验点: {}，可选: request, tool", other)),
        }
    }
}

/// 每种凭证唯一的校验点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPolicy {
    pub send: Enforcement,
    pub notify: Enforcement,
    pub keywords: Enforcement,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            send: Enforcement::Request,
            notify: Enforcement::Tool,
            keywords: Enforcement::Tool,
        }
    }
}

impl AuthPolicy {
    /// 所有种类都在工具层校验
    pub fn tool_only() -> Self {
        Self {
            send: Enforcement::Tool,
            notify: Enforcement::Tool,
            keywords: Enforcement::Tool,
        }
    }

    pub fn enforcement(&self, kind: CredentialKind) -> Enforcement {
        match kind {
            CredentialKind::Send => self.send,
            CredentialKind::Notify => self.notify,
            CredentialKind::Keywords => self.keywords,
        }
    }

    pub fn set(&mut self, kind: CredentialKind, enforcement: Enforcement) {
        match kind {
            CredentialKind::Send => self.send = enforcement,
            CredentialKind::Notify => self.notify = enforcement,
            CredentialKind::Keywords => self.keywords = enforcement,
        }
    }

    /// 请求层校验，返回第一个不通过的凭证种类
    pub fn authorize(&self, bundle: &CredentialBundle) -> std::result::Result<(), CredentialKind> {
        for kind in CredentialKind::ALL {
            if self.enforcement(kind) == Enforcement::Request && !kind.is_valid(bundle.get(kind)) {
                return Err(kind);
            }
        }
        Ok(())
    }
}
