// crates/mw_foundation/src/validation.rs

//! 运行时验证工具
//!
//! 配置验证采用"收集后拒绝"策略: 一次校验收集全部违规项，
//! 调用方据此整体接受或整体拒绝，不存在半套配置生效的状态。
//!
//! # 示例
//!
//! ```
//! use mw_foundation::validation::{ValidationError, ValidationReport};
//!
//! let mut report = ValidationReport::new();
//! let dt = -0.1f64;
//! if dt <= 0.0 {
//!     report.add_error(ValidationError::NonPositive { field: "dt", value: dt });
//! }
//! assert!(report.has_errors());
//! assert!(report.into_result("时间配置").is_err());
//! ```

use std::fmt;

use crate::error::{MwError, MwResult};

/// 单条验证错误
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// 要求严格为正的字段取了非正值
    NonPositive {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
    },
    /// 数值非有限(NaN 或无穷)
    NotFinite {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
    },
    /// 要求至少为 1 的计数取了 0
    ZeroCount {
        /// 字段名
        field: &'static str,
    },
    /// 障碍物包围盒在某轴上 min >= max
    EmptyBox {
        /// 盒子序号
        index: usize,
        /// 轴名 x/y/z
        axis: char,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 数值超出允许区间
    OutOfInterval {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 缺少必需字段
    Missing {
        /// 字段名
        field: &'static str,
        /// 缺少原因说明
        reason: &'static str,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { field, value } => {
                write!(f, "{field} 必须为正, 实际 {value}")
            }
            Self::NotFinite { field, value } => {
                write!(f, "{field} 必须有限, 实际 {value}")
            }
            Self::ZeroCount { field } => write!(f, "{field} 至少为 1"),
            Self::EmptyBox {
                index,
                axis,
                min,
                max,
            } => write!(
                f,
                "障碍物 #{index} 在 {axis} 轴上为空: min={min} >= max={max}"
            ),
            Self::OutOfInterval {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} = {value} 超出区间 [{min}, {max}]"),
            Self::Missing { field, reason } => write!(f, "缺少 {field}: {reason}"),
        }
    }
}

/// 验证报告
///
/// 收集一次校验过程中发现的全部错误。
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// 创建空报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一条错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 是否存在错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 是否通过
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一份报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
    }

    /// 转换为结果: 无错误返回 Ok，否则汇总为一条配置错误
    pub fn into_result(self, context: &str) -> MwResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(MwError::config(format!("{context}: {joined}")))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "验证报告: {} 个错误", self.error_count())?;
        for e in &self.errors {
            writeln!(f, "  - {e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.into_result("配置").is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::NonPositive {
            field: "dt",
            value: -1.0,
        });
        report.add_error(ValidationError::ZeroCount { field: "nx" });
        assert_eq!(report.error_count(), 2);

        let err = report.into_result("作业配置").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("dt"));
        assert!(msg.contains("nx"));
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationReport::new();
        a.add_error(ValidationError::ZeroCount { field: "nx" });
        let mut b = ValidationReport::new();
        b.add_error(ValidationError::ZeroCount { field: "ny" });
        a.merge(b);
        assert_eq!(a.error_count(), 2);
    }

    #[test]
    fn test_empty_box_display() {
        let e = ValidationError::EmptyBox {
            index: 3,
            axis: 'y',
            min: 2.0,
            max: 1.0,
        };
        let s = e.to_string();
        assert!(s.contains("#3"));
        assert!(s.contains('y'));
    }
}
