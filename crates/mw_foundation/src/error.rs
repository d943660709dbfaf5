// crates/mw_foundation/src/error.rs

//! 统一错误类型
//!
//! 提供全项目共用的错误枚举 [`MwError`] 和结果别名 [`MwResult`]。
//!
//! # 错误分类
//!
//! - 配置类: `Config` / `InvalidInput` / `OutOfRange` / `SizeMismatch`
//! - 运行类: `Cancelled`(协作取消，非失败) / `Engine`(引擎推进失败) /
//!   `AlreadyRunning`
//! - 基础设施: `Io` / `Channel` / `NotFound`

use std::sync::mpsc;
use thiserror::Error;

/// 统一结果类型
pub type MwResult<T> = Result<T, MwError>;

/// MicroWind 统一错误类型
#[derive(Error, Debug)]
pub enum MwError {
    /// 配置错误，创建阶段立即返回调用方
    #[error("配置错误: {message}")]
    Config {
        /// 错误描述
        message: String,
    },

    /// 无效输入
    #[error("无效输入: {message}")]
    InvalidInput {
        /// 错误描述
        message: String,
    },

    /// 数值超出允许范围
    #[error("{field} = {value} 超出范围 [{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: String,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },

    /// 尺寸不匹配
    #[error("{name} 尺寸不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 对象名
        name: String,
        /// 期望尺寸
        expected: usize,
        /// 实际尺寸
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index} >= {len}")]
    IndexOutOfBounds {
        /// 访问的索引
        index: usize,
        /// 容器长度
        len: usize,
    },

    /// 未找到目标
    #[error("未找到: {what}")]
    NotFound {
        /// 目标描述
        what: String,
    },

    /// 已有运行中的任务，拒绝重入
    #[error("{what} 正在运行中")]
    AlreadyRunning {
        /// 运行主体描述
        what: String,
    },

    /// 协作取消信号，属正常流程而非失败
    #[error("任务已取消")]
    Cancelled,

    /// 外部引擎推进失败，对单个作业致命
    #[error("引擎故障: {message}")]
    Engine {
        /// 引擎报告的原因
        message: String,
    },

    /// IO 错误
    #[error("IO 错误: {message}")]
    Io {
        /// 错误描述
        message: String,
        /// 底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 通道通信错误
    #[error("通道错误: {message}")]
    Channel {
        /// 错误描述
        message: String,
    },

    /// 其他错误
    #[error("{0}")]
    Other(String),
}

impl MwError {
    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 创建无效输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 创建未找到错误
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// 创建重入拒绝错误
    pub fn already_running(what: impl Into<String>) -> Self {
        Self::AlreadyRunning { what: what.into() }
    }

    /// 创建引擎故障错误
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// 创建不带底层来源的 IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 创建通道错误
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// 是否为取消信号
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// 是否为引擎故障
    pub fn is_engine_fault(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }
}

impl From<std::io::Error> for MwError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

impl<T> From<mpsc::SendError<T>> for MwError {
    fn from(_: mpsc::SendError<T>) -> Self {
        Self::Channel {
            message: "接收端已关闭".to_string(),
        }
    }
}

impl From<mpsc::RecvError> for MwError {
    fn from(_: mpsc::RecvError) -> Self {
        Self::Channel {
            message: "发送端已关闭".to_string(),
        }
    }
}

// ============================================================
// 检查函数
// ============================================================

/// 检查数值位于闭区间 [min, max] 内
pub fn check_range(field: &str, value: f64, min: f64, max: f64) -> MwResult<()> {
    if value < min || value > max || value.is_nan() {
        return Err(MwError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// 检查数值有限
pub fn check_finite(field: &str, value: f64) -> MwResult<()> {
    if !value.is_finite() {
        return Err(MwError::invalid_input(format!("{field} 必须为有限值, 实际 {value}")));
    }
    Ok(())
}

/// 检查尺寸一致
pub fn check_size(name: &str, expected: usize, actual: usize) -> MwResult<()> {
    if expected != actual {
        return Err(MwError::SizeMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// 检查计数至少为 1
pub fn check_count(field: &str, value: usize) -> MwResult<()> {
    if value == 0 {
        return Err(MwError::invalid_input(format!("{field} 至少为 1")));
    }
    Ok(())
}

/// 检查索引在界内
pub fn check_index(index: usize, len: usize) -> MwResult<()> {
    if index >= len {
        return Err(MwError::IndexOutOfBounds { index, len });
    }
    Ok(())
}
