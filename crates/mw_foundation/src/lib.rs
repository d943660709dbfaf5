// crates/mw_foundation/src/lib.rs

//! MicroWind Foundation Layer
//!
//! 基础层，提供整个项目的错误类型与运行时验证工具。
//! 不包含任何业务知识，上层 crate 均依赖于此。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 [`MwError`] 与常用检查函数
//! - [`validation`]: 配置验证报告，支持一次性收集全部违规项
//!
//! # 设计原则
//!
//! 1. 可恢复错误一律通过 [`MwResult`] 返回，库代码不 panic
//! 2. 配置要么整体接受，要么整体拒绝，拒绝时报告全部问题
//! 3. 除 thiserror 外零外部依赖

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod validation;

pub use error::{MwError, MwResult};
pub use validation::{ValidationError, ValidationReport};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{
        check_count, check_finite, check_index, check_range, check_size, MwError, MwResult,
    };
    pub use crate::validation::{ValidationError, ValidationReport};
}
