// crates/mw_stats/src/direction.rs

//! 方位扇区划分
//!
//! 风向以度计，取值在 [0°, 360°) 上回绕。扇区由其中心角定义，
//! 相邻中心角的中点作为扇区边界; 最高边界之上与最低边界之下
//! 的角度回绕归入第 0 扇区。中心角不要求等宽，但常见用法是
//! `sector_centers` 生成的等宽扇区。

use mw_foundation::prelude::*;

/// 生成 n 个等宽扇区的中心角
///
/// 中心角为 `360/n * i` (i = 0..n)，第 0 扇区以正北 0° 为中心。
pub fn sector_centers(n: usize) -> Vec<f64> {
    let width = 360.0 / n as f64;
    (0..n).map(|i| width * i as f64).collect()
}

/// 由扇区中心角计算扇区边界
///
/// 边界取排序后相邻中心角的中点; 首尾各补一个回绕副本
/// (最小中心角 ±360°)，因此 n 个中心角产出 n+1 条边界，
/// 第 i 扇区覆盖 `[bounds[i], bounds[i+1])`。
pub fn sector_bounds(centers: &[f64]) -> MwResult<Vec<f64>> {
    if centers.is_empty() {
        return Err(MwError::invalid_input("扇区中心角列表为空"));
    }
    let mut padded = centers.to_vec();
    padded.push(centers[0] - 360.0);
    padded.push(centers[0] + 360.0);
    padded.sort_by(|a, b| a.total_cmp(b));

    let mut bounds = Vec::with_capacity(padded.len() - 1);
    for pair in padded.windows(2) {
        bounds.push(0.5 * (pair[0] + pair[1]));
    }
    Ok(bounds)
}

/// 把角度归入最近的扇区，返回扇区序号
///
/// 角度先回绕到 `[bounds[0], bounds[0]+360)`，再线性查找所属
/// 区间; 落在最高边界之上的回绕区间属于第 0 扇区。
pub fn closest_sector(angle: f64, bounds: &[f64]) -> usize {
    if bounds.len() < 2 {
        return 0;
    }
    let lo = bounds[0];
    let mut a = angle;
    while a >= lo + 360.0 {
        a -= 360.0;
    }
    while a < lo {
        a += 360.0;
    }
    for i in 0..bounds.len() - 1 {
        if a >= bounds[i] && a < bounds[i + 1] {
            return i;
        }
    }
    // [bounds[last], bounds[0]+360) 的回绕区间
    0
}

/// 把逐时风速按风向归入 n 个等宽扇区
///
/// 返回每扇区一个风速列表，扇区顺序与 [`sector_centers`] 一致。
/// 速度与方向序列长度必须一致。
pub fn bin_by_sector(
    speeds: &[f64],
    directions: &[f64],
    n_sectors: usize,
) -> MwResult<Vec<Vec<f64>>> {
    check_count("扇区数", n_sectors)?;
    check_size("风向序列", speeds.len(), directions.len())?;

    let bounds = sector_bounds(&sector_centers(n_sectors))?;
    let mut binned = vec![Vec::new(); n_sectors];
    for (&speed, &dir) in speeds.iter().zip(directions.iter()) {
        binned[closest_sector(dir, &bounds)].push(speed);
    }
    Ok(binned)
}

/// 按小时数降序排列的扇区序号
///
/// 小时数相同的扇区保持原有相对顺序，结果可复现。
pub fn dominant_order(binned: &[Vec<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..binned.len()).collect();
    order.sort_by(|&a, &b| binned[b].len().cmp(&binned[a].len()));
    order
}
