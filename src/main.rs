//! Notification MCP CLI
//!
//! 启动 MCP HTTP 服务，或打印工具列表

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use notification_mcp::{build_toolset, CredentialBundle, ServerConfig};

#[derive(Parser)]
#[command(name = "notification-mcp")]
#[command(about = "Notification MCP - 邮件、微信推送与关键词研究的 MCP 服务")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 MCP HTTP 服务（默认命令）
    Serve {
        /// 监听地址
        #[arg(long)]
        host: Option<String>,
        /// 监听端口
        #[arg(long)]
        port: Option<u16>,
        /// 配置文件路径（默认 ~/.config/notification-mcp/config.json）
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// 列出可用工具
    Tools {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notification_mcp=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        config: None,
    }) {
        Commands::Serve { host, port, config } => {
            let mut server_config = ServerConfig::load(config.as_deref())?;
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            info!("Starting notification MCP server on {}", server_config.bind_addr());
            notification_mcp::serve(server_config).await?;
        }
        Commands::Tools { json } => {
            let collaborators = ServerConfig::default().collaborators()?;
            let tools = build_toolset(&CredentialBundle::default(), &collaborators).list();

            if json {
                println!("{}", serde_json::to_string_pretty(&tools)?);
            } else {
                println!("可用工具 {} 个:\n", tools.len());
                for tool in tools {
                    println!("  {} - {}", tool.name, tool.description);
                }
            }
        }
    }

    Ok(())
}
