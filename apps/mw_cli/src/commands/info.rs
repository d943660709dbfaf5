// apps/mw_cli/src/commands/info.rs

//! 批次信息命令
//!
//! 显示配置将展开出的网格规模、预计步数与内存占用，不执行模拟。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mw_field::GridSpec;
use mw_workflow::BatchConfig;
use tracing::info;

/// 信息参数
#[derive(Args)]
pub struct InfoArgs {
    /// 批次配置文件路径 (JSON)
    #[arg(short, long)]
    pub config: PathBuf,
}

/// 单个流场的近似字节数 (压力 + 三个交错速度分量, f64)
fn field_bytes(spec: &GridSpec) -> usize {
    let count = |(a, b, c): (usize, usize, usize)| a * b * c;
    let doubles =
        count(spec.padded_dims()) + count(spec.u_dims()) + count(spec.v_dims()) + count(spec.w_dims());
    doubles * std::mem::size_of::<f64>()
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== MicroWind 批次信息 ===");

    let config = BatchConfig::from_file(&args.config)
        .with_context(|| format!("加载批次配置失败: {}", args.config.display()))?;

    let domain = &config.template.domain;
    let time = &config.template.time;
    let spec = GridSpec::from_extent(domain.extent, domain.divisions)?;
    let (nx, ny, nz) = spec.cell_dims();

    println!("\n配置文件: {}", args.config.display());
    println!("\n[计算域]");
    println!(
        "  尺寸:       {:.1} × {:.1} × {:.1} m",
        domain.extent[0], domain.extent[1], domain.extent[2]
    );
    println!("  离散:       {} × {} × {} 单元", nx, ny, nz);
    println!("  单元数:     {}", spec.cell_count());
    println!("  节点数:     {}", spec.node_count());
    println!("  参考风速:   {} m/s", domain.wind_speed);
    println!("  地形类别:   {:?}", domain.terrain);

    println!("\n[时间]");
    println!("  步长:       {} s", time.dt);
    println!("  时域:       {} s", time.t_end);
    println!("  预计步数:   {}", time.step_hint());
    println!("  平均窗口:   {} 条快照", config.template.mean_window);
    println!(
        "  残差记录:   {}",
        if config.template.residuals { "开" } else { "关" }
    );

    // 主循环同时持有当前场、上一步副本与平均窗口
    let per_field = field_bytes(&spec);
    let resident = per_field * (config.template.mean_window + 2);
    println!("\n[内存估算]");
    println!("  单场:       {:.1} MB", per_field as f64 / 1048576.0);
    println!("  运行峰值:   {:.1} MB / 作业", resident as f64 / 1048576.0);

    println!("\n[作业]");
    println!("  数量:       {}", config.job_count());
    for (idx, group) in config.groups.iter().enumerate() {
        println!("  作业 {:>3}:   {} 个障碍盒", idx, group.len());
    }

    Ok(())
}
