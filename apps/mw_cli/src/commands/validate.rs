// apps/mw_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 解析批次配置并一次性报告全部违规项，不创建任何作业。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use mw_foundation::ValidationReport;
use mw_workflow::BatchConfig;
use tracing::info;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 批次配置文件路径 (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// 严格模式 (零障碍物的分组也视为错误)
    #[arg(long)]
    pub strict: bool,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== MicroWind 配置验证 ===");
    println!("\n检查配置文件: {}", args.config.display());

    // 文件与 JSON 层面的错误立即报告
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("无法读取配置文件: {}", args.config.display()))?;
    let config: BatchConfig = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(e) => bail!("JSON 解析错误: {}", e),
    };
    println!("  ✓ JSON 格式有效");

    // 语义层面的违规一次性收集
    let mut report = ValidationReport::new();
    config.validate_into(&mut report);

    let mut warnings = Vec::new();
    for (idx, group) in config.groups.iter().enumerate() {
        if group.is_empty() {
            warnings.push(format!("分组 #{idx} 没有障碍物 (空风洞作业)"));
        }
    }
    if config.template.time.step_hint() == 0 {
        warnings.push("dt > t_end: 作业不执行任何步就完成".to_string());
    }

    for w in &warnings {
        println!("  ⚠ {w}");
    }

    if report.has_errors() {
        println!("\n发现 {} 个错误:", report.error_count());
        println!("{report}");
        bail!("配置无效");
    }
    if args.strict && !warnings.is_empty() {
        bail!("严格模式: {} 条警告视为错误", warnings.len());
    }

    println!("  ✓ 配置有效: {} 个作业", config.job_count());
    Ok(())
}
