// apps/mw_cli/src/commands/run.rs

//! 运行批次命令
//!
//! 加载批次配置，启动一轮批次执行并等待终了报告。
//! 残差按作业落盘到输出目录，每个作业另存一份 JSON 状态摘要。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use mw_domain::{RelaxationFactory, WindTunnelBuilder};
use mw_io::DirectorySinkFactory;
use mw_workflow::{BatchConfig, BatchOrchestrator, JobStatus, LoggingListener};
use tracing::{info, warn};

/// 运行批次参数
#[derive(Args)]
pub struct RunArgs {
    /// 批次配置文件路径 (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// 输出目录 (残差 CSV 与作业摘要)
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// 不写残差文件
    #[arg(long)]
    pub no_residuals: bool,

    /// 松弛引擎速率 [1/s]
    #[arg(long, default_value = "1.0")]
    pub rate: f64,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== MicroWind 批次启动 ===");

    let config = BatchConfig::from_file(&args.config)
        .with_context(|| format!("加载批次配置失败: {}", args.config.display()))?;
    info!(
        "配置: {} 个作业, dt={} s, t_end={} s, 平均窗口={}",
        config.job_count(),
        config.template.time.dt,
        config.template.time.t_end,
        config.template.mean_window
    );

    // 创建输出目录
    std::fs::create_dir_all(&args.output)?;

    // 参考协作方: 风洞域构建 + 松弛引擎
    let mut orchestrator =
        BatchOrchestrator::new(WindTunnelBuilder, RelaxationFactory { rate: args.rate });
    if !args.no_residuals {
        orchestrator = orchestrator
            .with_sink_factory(DirectorySinkFactory::new(&args.output).prefix("residual_"));
    }
    orchestrator
        .events()
        .add_listener(Arc::new(LoggingListener::new("batch")));

    let ids = orchestrator.create_all(&config.groups, &config.template)?;
    info!("已创建作业: {} 个", ids.len());

    // 提交后调用方不被阻塞; CLI 在凭证上等终了报告
    let start = Instant::now();
    let ticket = orchestrator.run_all()?;
    info!("批次轮次 {} 已提交", ticket.run_id());

    let report = ticket.wait()?;
    let elapsed = start.elapsed();

    // 逐作业结果表
    println!();
    println!("{:>4}  {:>10}  {:>8}  {:>9}  {:>8}", "作业", "状态", "步数", "残差条数", "结果");
    for (id, status) in &report.outcomes {
        let job = orchestrator.job(*id);
        let (steps, residuals, has_result) = job
            .map(|j| {
                let stats = j.stats();
                (stats.steps, stats.residual_records, j.result().is_some())
            })
            .unwrap_or((0, 0, false));
        println!(
            "{:>4}  {:>10}  {:>8}  {:>9}  {:>8}",
            id,
            status.to_string(),
            steps,
            residuals,
            if has_result { "有" } else { "无" }
        );
    }
    println!();

    // 作业摘要落盘
    for job in orchestrator.jobs().iter() {
        let path = args.output.join(format!("job_{}.json", job.id().index()));
        let text = serde_json::to_string_pretty(&job.summary())?;
        std::fs::write(&path, text)
            .with_context(|| format!("写入作业摘要失败: {}", path.display()))?;
    }

    info!("=== 批次完成 ===");
    info!("壁钟耗时: {:.2} s", elapsed.as_secs_f64());
    info!("输出目录: {}", args.output.display());

    if !report.success {
        for id in &report.unclean {
            if let Some(job) = orchestrator.job(*id) {
                match job.status() {
                    JobStatus::Faulted => {
                        warn!("作业 {} 故障: {}", id, job.error().unwrap_or_default())
                    }
                    status => warn!("作业 {} 未完成: {}", id, status),
                }
            }
        }
        bail!("批次未全部完成: {} 个作业不干净", report.unclean.len());
    }
    Ok(())
}
