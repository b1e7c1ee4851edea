//! 服务配置
//!
//! 优先级：默认值 < 配置文件 < 环境变量 < 命令行参数。
//! 配置文件默认位于 `~/.config/notification-mcp/config.json`，不存在时跳过。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{AuthPolicy, CredentialKind, Enforcement};
use crate::clients::{
    Collaborators, KeywordsConfig, PlunkConfig, ServerChanConfig, DEFAULT_TIMEOUT_SECS,
};
use crate::clients::{keywords::KEYWORDS_API_URL, plunk::PLUNK_API_URL};

/// 默认监听地址
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// 默认端口
pub const DEFAULT_PORT: u16 = 3000;

/// 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub plunk_base_url: String,
    /// 未设置时按 key 推导 ServerChan 地址
    pub serverchan_base_url: Option<String>,
    pub keywords_base_url: String,
    /// 第三方请求超时（秒）
    pub timeout_secs: u64,
    /// 每种凭证的校验点
    pub auth: AuthPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            plunk_base_url: PLUNK_API_URL.to_string(),
            serverchan_base_url: None,
            keywords_base_url: KEYWORDS_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth: AuthPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// 加载配置
    ///
    /// 显式指定的配置文件必须存在；默认路径不存在时使用默认值。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 从 JSON 文件读取，缺省字段取默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式错误: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// 应用环境变量覆盖；空值视为未设置
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.host = host;
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("PORT 不是合法端口: {}", port))?;
        }
        if let Some(url) = get("PLUNK_BASE_URL") {
            self.plunk_base_url = url;
        }
        if let Some(url) = get("SERVERCHAN_BASE_URL") {
            self.serverchan_base_url = Some(url);
        }
        if let Some(url) = get("KEYWORDS_BASE_URL") {
            self.keywords_base_url = url;
        }
        if let Some(secs) = get("UPSTREAM_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| anyhow!("UPSTREAM_TIMEOUT_SECS 不是合法数字: {}", secs))?;
        }

        for kind in CredentialKind::ALL {
            let key = auth_env_key(kind);
            if let Some(value) = get(key) {
                let enforcement: Enforcement = value
                    .parse()
                    .with_context(|| format!("{} 配置无效", key))?;
                self.auth.set(kind, enforcement);
            }
        }
        Ok(())
    }

    /// 监听地址 `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 根据配置构建第三方客户端
    pub fn collaborators(&self) -> Result<Collaborators> {
        Collaborators::new(
            PlunkConfig {
                base_url: self.plunk_base_url.clone(),
                timeout_secs: self.timeout_secs,
            },
            ServerChanConfig {
                base_url: self.serverchan_base_url.clone(),
                timeout_secs: self.timeout_secs,
            },
            KeywordsConfig {
                base_url: self.keywords_base_url.clone(),
                timeout_secs: self.timeout_secs,
            },
        )
    }
}

fn auth_env_key(kind: CredentialKind) -> &'static str {
    match kind {
        CredentialKind::Send => "MCP_AUTH_SEND",
        CredentialKind::Notify => "MCP_AUTH_NOTIFY",
        CredentialKind::Keywords => "MCP_AUTH_KEYWORDS",
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/notification-mcp/config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.plunk_base_url, "https://api.useplunk.com");
        assert!(config.serverchan_base_url.is_none());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.auth, AuthPolicy::default());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 8080, "serverchan_base_url": "http://localhost:9000", "auth": {{"send": "tool"}}}}"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.serverchan_base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.auth.send, Enforcement::Tool);
        assert_eq!(config.auth.notify, Enforcement::Tool);
    }

    #[test]
    fn test_from_file_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(ServerConfig::load(Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("HOST", "127.0.0.1"),
                ("PORT", "4000"),
                ("PLUNK_BASE_URL", "http://plunk.local"),
                ("UPSTREAM_TIMEOUT_SECS", "5"),
                ("MCP_AUTH_SEND", "tool"),
                ("MCP_AUTH_KEYWORDS", "Request"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
        assert_eq!(config.plunk_base_url, "http://plunk.local");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.auth.send, Enforcement::Tool);
        assert_eq!(config.auth.keywords, Enforcement::Request);
    }

    #[test]
    fn test_env_empty_value_ignored() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_env_invalid_values() {
        let mut config = ServerConfig::default();
        let err = config.apply_env(env(&[("PORT", "abc")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let mut config = ServerConfig::default();
        let err = config.apply_env(env(&[("MCP_AUTH_NOTIFY", "header")])).unwrap_err();
        assert!(err.to_string().contains("MCP_AUTH_NOTIFY"));
    }

    #[test]
    fn test_collaborators_from_config() {
        assert!(ServerConfig::default().collaborators().is_ok());
    }
}
