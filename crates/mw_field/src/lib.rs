// crates/mw_field/src/lib.rs

//! MicroWind Field Layer
//!
//! 交错网格上的流场状态与时间窗口工具。
//!
//! # 模块概览
//!
//! - [`grid`]: 网格几何 [`GridSpec`]，内部/带幽灵层/节点三套格点的换算
//! - [`field`]: 交错布置的流场 [`FlowField`] (压力 + 三个速度分量)
//! - [`snapshot`]: 场快照与尾部平均窗口环形缓冲 [`SnapshotRing`]
//! - [`residual`]: 逐步残差记录 [`ResidualRecord`]
//! - [`engine`]: 外部引擎接缝 [`FlowEngine`] / [`FieldProbe`] 与透传参数包
//! - [`probe`]: 最近单元参考采样器 [`StaggeredProbe`]
//!
//! 数值方法本身不在本层: 推进与采样都通过 trait 交给外部引擎。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod field;
pub mod grid;
pub mod probe;
pub mod residual;
pub mod snapshot;

pub use engine::{FieldProbe, FieldSample, FlowEngine, SolverParams};
pub use field::FlowField;
pub use grid::GridSpec;
pub use probe::StaggeredProbe;
pub use residual::{FieldDelta, ResidualRecord};
pub use snapshot::{FieldSnapshot, SnapshotRing};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::engine::{FieldProbe, FieldSample, FlowEngine, SolverParams};
    pub use crate::field::FlowField;
    pub use crate::grid::GridSpec;
    pub use crate::residual::{FieldDelta, ResidualRecord};
    pub use crate::snapshot::{FieldSnapshot, SnapshotRing};
}
