// crates/mw_field/src/engine.rs

//! 外部引擎接缝
//!
//! 逐步求解(压力投影 / 对流扩散)的数值内容不属于本系统，
//! 这里只定义编排层调用外部引擎的两条接缝:
//!
//! - [`FlowEngine::advance`]: 同步推进一个时间步，失败即引擎故障
//! - [`FieldProbe::sample`]: 结果物化阶段按坐标查询压力与速度
//!
//! [`SolverParams`] 是透传给引擎的公差参数包，编排层只负责
//! 基本合法性校验，不解释其语义。

use glam::DVec3;
use mw_foundation::prelude::*;
use mw_foundation::validation::{ValidationError, ValidationReport};
use serde::{Deserialize, Serialize};

use crate::field::FlowField;

/// 引擎公差参数包，原样传递给外部引擎
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// 运动粘度 [m²/s]
    #[serde(default = "default_viscosity")]
    pub viscosity: f64,

    /// 迭代收敛容差
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// 最少迭代次数
    #[serde(default = "default_min_iterations")]
    pub min_iterations: usize,

    /// 最多迭代次数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 回溯阶数，1 或 2
    #[serde(default = "default_backtrace_order")]
    pub backtrace_order: u8,

    /// 是否启用质量修正
    #[serde(default)]
    pub mass_correction: bool,

    /// 质量修正松弛系数，(0, 1]
    #[serde(default = "default_mass_correction_alpha")]
    pub mass_correction_alpha: f64,

    /// 引擎详细输出
    #[serde(default)]
    pub verbose: bool,
}

fn default_viscosity() -> f64 {
    1.511e-5
}
fn default_tolerance() -> f64 {
    1e-4
}
fn default_min_iterations() -> usize {
    1
}
fn default_max_iterations() -> usize {
    30
}
fn default_backtrace_order() -> u8 {
    2
}
fn default_mass_correction_alpha() -> f64 {
    0.7
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            viscosity: default_viscosity(),
            tolerance: default_tolerance(),
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
            backtrace_order: default_backtrace_order(),
            mass_correction: false,
            mass_correction_alpha: default_mass_correction_alpha(),
            verbose: false,
        }
    }
}

impl SolverParams {
    /// 将违规项写入验证报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        if !(self.viscosity > 0.0 && self.viscosity.is_finite()) {
            report.add_error(ValidationError::NonPositive {
                field: "solver.viscosity",
                value: self.viscosity,
            });
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            report.add_error(ValidationError::NonPositive {
                field: "solver.tolerance",
                value: self.tolerance,
            });
        }
        if self.backtrace_order != 1 && self.backtrace_order != 2 {
            report.add_error(ValidationError::OutOfInterval {
                field: "solver.backtrace_order",
                value: self.backtrace_order as f64,
                min: 1.0,
                max: 2.0,
            });
        }
        if self.min_iterations > self.max_iterations {
            report.add_error(ValidationError::OutOfInterval {
                field: "solver.min_iterations",
                value: self.min_iterations as f64,
                min: 0.0,
                max: self.max_iterations as f64,
            });
        }
        if !(self.mass_correction_alpha > 0.0 && self.mass_correction_alpha <= 1.0) {
            report.add_error(ValidationError::OutOfInterval {
                field: "solver.mass_correction_alpha",
                value: self.mass_correction_alpha,
                min: 0.0,
                max: 1.0,
            });
        }
    }

    /// 独立校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("求解参数")
    }
}

/// 外部推进引擎
///
/// 每步恰好调用一次 `advance`，同步执行，编排层不做重试。
/// 返回 `Err` 视为引擎故障: 该作业转入 Faulted，批次继续。
pub trait FlowEngine: Send {
    /// 引擎名称，用于日志
    fn name(&self) -> &str {
        "engine"
    }

    /// 在模拟时刻 `time` 将场原地推进 `dt`
    fn advance(&mut self, field: &mut FlowField, time: f64, dt: f64) -> MwResult<()>;

    /// 引擎自带的场查询原语，结果物化阶段使用
    fn probe(&self) -> &dyn FieldProbe;
}

/// 一次场查询的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    /// 压力
    pub pressure: f64,
    /// 速度向量
    pub velocity: DVec3,
}

impl FieldSample {
    /// 全零样本，用于障碍物屏蔽
    pub fn zero() -> Self {
        Self {
            pressure: 0.0,
            velocity: DVec3::ZERO,
        }
    }
}

/// 场查询接缝，仅在结果物化阶段使用
pub trait FieldProbe: Send + Sync {
    /// 在给定坐标查询压力与速度
    fn sample(&self, field: &FlowField, point: DVec3) -> FieldSample;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let p = SolverParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.backtrace_order, 2);
        assert_eq!(p.max_iterations, 30);
        assert!((p.viscosity - 1.511e-5).abs() < 1e-20);
    }

    #[test]
    fn test_invalid_order_rejected() {
        let p = SolverParams {
            backtrace_order: 3,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let p = SolverParams {
            viscosity: -1.0,
            tolerance: 0.0,
            backtrace_order: 0,
            ..Default::default()
        };
        let err = p.validate().unwrap_err().to_string();
        assert!(err.contains("viscosity"));
        assert!(err.contains("tolerance"));
        assert!(err.contains("backtrace_order"));
    }

    #[test]
    fn test_serde_defaults_fill_missing() {
        let p: SolverParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, SolverParams::default());
    }

    #[test]
    fn test_zero_sample() {
        let s = FieldSample::zero();
        assert_eq!(s.pressure, 0.0);
        assert_eq!(s.velocity, DVec3::ZERO);
    }
}
