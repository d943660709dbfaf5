// crates/mw_workflow/src/lib.rs

//! MicroWind Workflow Layer
//!
//! 系统核心: 作业生命周期、批次编排、结果物化。
//!
//! # 模块概览
//!
//! - [`config`]: 两级配置 [`JobTemplate`] / [`JobConfig`] / [`BatchConfig`]
//! - [`job`]: 作业对象 [`SimulationJob`] 与状态机 [`JobStatus`]
//! - [`runner`]: 单作业固定步长主循环 (crate 内部)
//! - [`results`]: 结果物化 [`JobResult`] 与障碍物掩蔽采样
//! - [`events`]: 批次事件与监听器分发
//! - [`batch`]: 编排器 [`BatchOrchestrator`]、工作线程与完成凭证
//!
//! # 执行模型
//!
//! 单工作线程; 作业严格按序号依次执行，作业内步严格串行。
//! 取消是协作式的: 批次级标志在每个作业启动前检查，作业级
//! 标志在每步顶部检查，绝不抢占进行中的一步。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod events;
pub mod job;
pub mod results;
pub(crate) mod runner;

pub use batch::{BatchHandle, BatchOrchestrator, BatchReport, RunId, RunTicket};
pub use config::{BatchConfig, JobConfig, JobTemplate, TimeConfig};
pub use events::{BatchEvent, EventDispatcher, EventListener, FnListener, LoggingListener};
pub use job::{JobId, JobStats, JobStatus, JobSummary, SimulationJob};
pub use results::{JobResult, SampledGrid};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::batch::{BatchHandle, BatchOrchestrator, BatchReport, RunId, RunTicket};
    pub use crate::config::{BatchConfig, JobConfig, JobTemplate, TimeConfig};
    pub use crate::events::{BatchEvent, EventDispatcher, EventListener};
    pub use crate::job::{JobId, JobStats, JobStatus, JobSummary, SimulationJob};
    pub use crate::results::{JobResult, SampledGrid};
}
