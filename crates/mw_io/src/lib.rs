// crates/mw_io/src/lib.rs

//! MicroWind IO Layer
//!
//! 残差记录汇: 只追加的记录存储，每步接收一条记录。
//! 汇写入失败对作业非致命，由调用方记日志后吞掉。
//!
//! # 模块概览
//!
//! - [`residuals`]: [`ResidualSink`] 接缝与 CSV / 内存 / 空实现，
//!   以及按作业序号派生汇的 [`SinkFactory`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod residuals;

pub use residuals::{
    CsvResidualSink, DirectorySinkFactory, MemoryResidualSink, MemorySinkFactory,
    NullResidualSink, NullSinkFactory, ResidualSink, SinkFactory,
};
