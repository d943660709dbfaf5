// apps/mw_cli/src/main.rs

//! MicroWind 命令行界面
//!
//! 提供批次风场模拟的命令行工具。
//!
//! # 架构层级
//!
//! 本模块属于应用层，遵循以下原则：
//! - 只接触编排器的公开 API，不触碰作业内部状态
//! - 日志订阅器只在这里初始化，库层只发 tracing 事件

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// MicroWind 批次风场模拟命令行工具
#[derive(Parser)]
#[command(name = "mw_cli")]
#[command(author = "MicroWind Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MicroWind batch wind-flow simulation runner", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行批次
    Run(commands::run::RunArgs),
    /// 显示批次信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 执行命令
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
