// crates/mw_stats/src/lib.rs

//! MicroWind Statistics Layer
//!
//! 风统计工具: 把逐时风速/风向序列按方位扇区归类，并结合逐点
//! 加速系数统计全年超阈小时数。
//!
//! # 模块概览
//!
//! - [`direction`]: 等宽方位扇区、任意扇区中心的边界划分与回绕归类
//! - [`annual`]: 全年超阈小时统计 [`AnnualStats`]，带显式输入指纹缓存
//!
//! 本层只依赖基础层，不接触流场与作业编排。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annual;
pub mod direction;

pub use annual::{AnnualCalculator, AnnualInputs, AnnualStats};
pub use direction::{bin_by_sector, closest_sector, dominant_order, sector_bounds, sector_centers};
