// crates/mw_field/src/residual.rs

//! 逐步残差记录
//!
//! 每步推进后，对压力和三个速度分量分别计算与上一步场的
//! 逐元素绝对差，记录其最小值/最大值/平均值，用于收敛诊断。
//! 统计覆盖整个数组，幽灵层一并计入。
//!
//! 固定形状的记录类型保证外部汇(CSV 等)的列结构稳定，可单独测试。

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::field::FlowField;

/// 单个场的绝对差统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// 最小绝对差
    pub min: f64,
    /// 最大绝对差
    pub max: f64,
    /// 平均绝对差
    pub mean: f64,
}

impl FieldDelta {
    /// 对两个同形状数组计算逐元素绝对差统计
    pub fn of(a: &Array3<f64>, b: &Array3<f64>) -> Self {
        debug_assert_eq!(a.dim(), b.dim(), "残差比较要求同形状数组");
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            let d = (x - y).abs();
            if d < min {
                min = d;
            }
            if d > max {
                max = d;
            }
            sum += d;
        }
        let n = a.len();
        Self {
            min,
            max,
            mean: if n == 0 { 0.0 } else { sum / n as f64 },
        }
    }
}

/// 一步的完整残差记录
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    /// 记录时刻(推进该步前的模拟时间)
    pub time: f64,
    /// 压力场差
    pub pressure: FieldDelta,
    /// u 分量差
    pub u: FieldDelta,
    /// v 分量差
    pub v: FieldDelta,
    /// w 分量差
    pub w: FieldDelta,
}

impl ResidualRecord {
    /// 比较上一步与当前场，生成本步记录
    pub fn between(prev: &FlowField, curr: &FlowField, time: f64) -> Self {
        Self {
            time,
            pressure: FieldDelta::of(&prev.p, &curr.p),
            u: FieldDelta::of(&prev.u, &curr.u),
            v: FieldDelta::of(&prev.v, &curr.v),
            w: FieldDelta::of(&prev.w, &curr.w),
        }
    }
}
