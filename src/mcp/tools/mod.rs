//! 工具实现
//!
//! 每个工具模块提供 `descriptor(...)`，需要凭证的工具只接收自己那一个 `Credential`。

pub mod commission;
pub mod echo;
pub mod email;
pub mod keywords;
pub mod wechat;
