// crates/mw_domain/src/lib.rs

//! MicroWind Domain Layer
//!
//! 计算域构建: 地形风廓线、障碍物分类格网、初始场。
//!
//! # 模块概览
//!
//! - [`terrain`]: 地形类别与对数律风廓线
//! - [`obstacle`]: 轴对齐障碍盒与带幽灵层的障碍物分类格网
//! - [`builder`]: 域构建接缝 [`DomainBuilder`] 与默认实现 [`WindTunnelBuilder`]
//! - [`engine`]: 引擎构建接缝 [`EngineFactory`] 与参考引擎 [`RelaxationEngine`]
//!
//! 域构建在作业(重)创建时恰好调用一次；作业启动前不分配模拟状态。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod obstacle;
pub mod terrain;

pub use builder::{DomainBuilder, DomainConfig, DomainSetup, WindTunnelBuilder};
pub use engine::{EngineFactory, RelaxationEngine, RelaxationFactory};
pub use obstacle::{ObstacleBox, ObstacleGrid};
pub use terrain::{TerrainCategory, WindProfile};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::builder::{DomainBuilder, DomainConfig, DomainSetup, WindTunnelBuilder};
    pub use crate::engine::{EngineFactory, RelaxationFactory};
    pub use crate::obstacle::{ObstacleBox, ObstacleGrid};
    pub use crate::terrain::{TerrainCategory, WindProfile};
}
