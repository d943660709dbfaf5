// crates/mw_stats/src/annual.rs

//! 全年超阈小时统计
//!
//! 输入按扇区分好组的逐时风速序列，以及每个观测点在每个扇区
//! 下的加速系数。点 p 在扇区 d 的当地风速为
//! `speed * speedup[p][d]`; 统计当地风速达到阈值的小时数，
//! 逐点合计并按扇区细分。
//!
//! [`AnnualCalculator`] 带一层结果缓存，失效判据是对全部输入
//! (风速序列、加速系数表、阈值) 的 64 位指纹比较——不同输入
//! 即使求和恰好相同也会得到不同指纹，不存在均值代理那种碰撞。

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use mw_foundation::prelude::*;
use serde::{Deserialize, Serialize};

/// 一次统计的全部输入
#[derive(Debug, Clone, Copy)]
pub struct AnnualInputs<'a> {
    /// 按扇区分组的逐时风速 [m/s]，外层序号与扇区序号一致
    pub speeds_per_sector: &'a [Vec<f64>],
    /// 加速系数表: 每点一行，每行按扇区一列
    pub speedups: &'a [Vec<f64>],
    /// 风速阈值 [m/s]
    pub threshold: f64,
}

impl AnnualInputs<'_> {
    /// 校验输入形状
    ///
    /// 每个点的加速系数行长度必须等于扇区数; 阈值必须有限非负。
    pub fn validate(&self) -> MwResult<()> {
        check_finite("threshold", self.threshold)?;
        if self.threshold < 0.0 {
            return Err(MwError::invalid_input(format!(
                "threshold 不能为负, 实际 {}",
                self.threshold
            )));
        }
        let n_sectors = self.speeds_per_sector.len();
        for (p, row) in self.speedups.iter().enumerate() {
            if row.len() != n_sectors {
                return Err(MwError::SizeMismatch {
                    name: format!("点 #{p} 的加速系数行"),
                    expected: n_sectors,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }

    /// 输入指纹
    ///
    /// 对所有浮点输入的位模式与各序列长度做哈希。输入逐位相同
    /// 当且仅当指纹输入序列相同; NaN 的不同位模式视为不同输入。
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.speeds_per_sector.len().hash(&mut hasher);
        for series in self.speeds_per_sector {
            series.len().hash(&mut hasher);
            for v in series {
                v.to_bits().hash(&mut hasher);
            }
        }
        self.speedups.len().hash(&mut hasher);
        for row in self.speedups {
            row.len().hash(&mut hasher);
            for v in row {
                v.to_bits().hash(&mut hasher);
            }
        }
        self.threshold.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}

/// 全年超阈小时统计结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualStats {
    /// 逐点合计超阈小时数
    pub hours_per_point: Vec<f64>,
    /// 逐点、逐扇区超阈小时数
    pub hours_per_point_per_sector: Vec<Vec<f64>>,
}

impl AnnualStats {
    /// 观测点数
    pub fn point_count(&self) -> usize {
        self.hours_per_point.len()
    }
}

/// 执行一次统计
pub fn threshold_hours(inputs: &AnnualInputs<'_>) -> MwResult<AnnualStats> {
    inputs.validate()?;

    let n_sectors = inputs.speeds_per_sector.len();
    let n_points = inputs.speedups.len();

    let mut per_sector = vec![vec![0.0; n_sectors]; n_points];
    let mut totals = vec![0.0; n_points];

    for (p, row) in inputs.speedups.iter().enumerate() {
        for (d, series) in inputs.speeds_per_sector.iter().enumerate() {
            let speedup = row[d];
            let mut hours = 0.0;
            for &speed in series {
                if speed * speedup >= inputs.threshold {
                    hours += 1.0;
                }
            }
            per_sector[p][d] = hours;
            totals[p] += hours;
        }
    }

    Ok(AnnualStats {
        hours_per_point: totals,
        hours_per_point_per_sector: per_sector,
    })
}

/// 带输入指纹缓存的统计器
///
/// 同一指纹的重复调用直接返回缓存结果，不再扫描序列。
#[derive(Debug, Default)]
pub struct AnnualCalculator {
    fingerprint: Option<u64>,
    cached: Option<AnnualStats>,
}

impl AnnualCalculator {
    /// 创建空统计器
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算或复用统计结果
    pub fn compute(&mut self, inputs: &AnnualInputs<'_>) -> MwResult<&AnnualStats> {
        let fp = inputs.fingerprint();
        if self.fingerprint != Some(fp) || self.cached.is_none() {
            self.cached = Some(threshold_hours(inputs)?);
            self.fingerprint = Some(fp);
        }
        // 上面保证缓存已填充
        self.cached
            .as_ref()
            .ok_or_else(|| MwError::invalid_input("统计缓存为空"))
    }

    /// 最近一次计算的指纹
    pub fn last_fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    /// 清空缓存
    pub fn invalidate(&mut self) {
        self.fingerprint = None;
        self.cached = None;
    }
}
