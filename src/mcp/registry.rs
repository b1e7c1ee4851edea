//! 工具集工厂
//!
//! 每个请求调用一次 `build_toolset`，不存在跨请求共享的可变注册表。
//! 需要凭证的工具在调用时才校验凭证，注册本身总是成功。

use crate::auth::{CredentialBundle, CredentialKind};
use crate::clients::Collaborators;

use super::tool::ToolSet;
use super::tools::{commission, echo, email, keywords, wechat};

/// 为单个请求构建工具集
pub fn build_toolset(credentials: &CredentialBundle, collaborators: &Collaborators) -> ToolSet {
    let mut tools = ToolSet::new();

    tools.register(echo::descriptor());
    tools.register(commission::descriptor());
    tools.register(email::descriptor(
        collaborators.email.clone(),
        credentials.credential(CredentialKind::Send),
    ));
    tools.register(wechat::descriptor(
        collaborators.wechat.clone(),
        credentials.credential(CredentialKind::Notify),
    ));
    tools.register(keywords::descriptor(
        collaborators.keywords.clone(),
        credentials.credential(CredentialKind::Keywords),
    ));

    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{KeywordsConfig, PlunkConfig, ServerChanConfig};

    fn collaborators() -> Collaborators {
        Collaborators::new(
            PlunkConfig::default(),
            ServerChanConfig::default(),
            KeywordsConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_tools_registered_without_credentials() {
        let tools = build_toolset(&CredentialBundle::default(), &collaborators());
        assert_eq!(
            tools.names(),
            vec![
                "echo",
                "commission-calculator",
                "send-email",
                "wechat-message-push",
                "keywords-research"
            ]
        );
    }

    #[tokio::test]
    async fn test_echo_works_without_credentials() {
        let tools = build_toolset(&CredentialBundle::default(), &collaborators());
        let result = tools
            .get("echo")
            .unwrap()
            .invoke(serde_json::json!({"message": "hi"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("Tool echo: hi"));
    }

    #[tokio::test]
    async fn test_toolsets_are_independent_per_bundle() {
        let collaborators = collaborators();
        let without_key = build_toolset(&CredentialBundle::default(), &collaborators);
        let _with_key = build_toolset(
            &CredentialBundle::default().with(CredentialKind::Notify, "SCT_other_request"),
            &collaborators,
        );

        // 另一个请求的 key 不会影响本请求的工具
        let result = without_key
            .get("wechat-message-push")
            .unwrap()
            .invoke(serde_json::json!({"title": "t", "description": "d"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some(wechat::MISSING_KEY_MESSAGE));
    }
}
