// crates/mw_workflow/src/job.rs

//! 作业定义模块
//!
//! 单个模拟作业的标识、状态机与运行统计。
//!
//! 作业对象在编排器、工作线程与查询方之间以 `Arc` 共享: 轻量状态
//! (状态机、统计、残差日志、结果句柄) 放在 `RwLock` 里短暂加锁更新，
//! 重量运行状态 (场、上一步副本、快照环) 只存在于工作线程的栈上。
//! 查询方因此永远不会被一步模拟阻塞。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mw_domain::DomainSetup;
use mw_field::ResidualRecord;
use mw_foundation::prelude::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::JobConfig;
use crate::results::JobResult;

/// 作业ID
///
/// 批次内的序号: 每次 `create_all` 都从 0 重新编号，
/// 序号同时决定批次的执行顺序与残差文件的命名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(usize);

impl JobId {
    /// 由批次内序号创建
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// 批次内序号
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for JobId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 作业状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// 已创建，尚未启动
    #[default]
    Created,
    /// 运行中
    Running,
    /// 跑满时域正常结束
    Completed,
    /// 协作取消，提前退出
    Stopped,
    /// 引擎故障终止
    Faulted,
}

impl JobStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Faulted)
    }

    /// 是否干净完成 (跑满时域)
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
            Self::Faulted => "Faulted",
        };
        write!(f, "{}", s)
    }
}

/// 作业运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// 已执行步数
    pub steps: u64,
    /// 平均窗口内的快照条数
    pub snapshots: usize,
    /// 已记录残差条数
    pub residual_records: usize,
    /// 残差汇写入失败次数 (非致命)
    pub sink_failures: usize,
    /// 壁钟耗时
    pub elapsed: Duration,
}

/// 作业状态快照 (查询用的纯数据副本)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// 作业ID
    pub id: JobId,
    /// 当前状态
    pub status: JobStatus,
    /// 运行统计
    pub stats: JobStats,
    /// 故障信息 (仅 Faulted)
    pub error: Option<String>,
    /// 是否已有结果集
    pub has_result: bool,
    /// 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// 最近一次启动时间
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    /// 最近一次结束时间
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 受锁保护的可变作业状态
#[derive(Debug, Default)]
struct JobState {
    status: JobStatus,
    stats: JobStats,
    error: Option<String>,
    residuals: Vec<ResidualRecord>,
    result: Option<Arc<JobResult>>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 模拟作业
///
/// 创建时即完成计算域构建 (网格、障碍物格网、初始场)，
/// 启动前不再分配任何模拟状态。取消标志独立于状态锁，
/// `request_stop` 在任何线程上都是无锁写。
pub struct SimulationJob {
    id: JobId,
    config: JobConfig,
    setup: Arc<DomainSetup>,
    run_flag: Arc<AtomicBool>,
    created_at: chrono::DateTime<chrono::Utc>,
    state: RwLock<JobState>,
}

impl SimulationJob {
    /// 创建新作业，取消标志初始为举起 (可运行)
    pub fn new(id: JobId, config: JobConfig, setup: Arc<DomainSetup>) -> Self {
        Self {
            id,
            config,
            setup,
            run_flag: Arc::new(AtomicBool::new(true)),
            created_at: chrono::Utc::now(),
            state: RwLock::new(JobState::default()),
        }
    }

    /// 作业ID
    pub fn id(&self) -> JobId {
        self.id
    }

    /// 作业配置 (模板展开后的冻结副本)
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// 计算域 (创建时构建，作业生命周期内不变)
    pub fn setup(&self) -> &Arc<DomainSetup> {
        &self.setup
    }

    /// 当前状态
    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    /// 当前运行统计
    pub fn stats(&self) -> JobStats {
        self.state.read().stats
    }

    /// 故障信息
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// 结果集 (Completed 必有; Stopped 仅当窗口非空; 其余为 None)
    pub fn result(&self) -> Option<Arc<JobResult>> {
        self.state.read().result.clone()
    }

    /// 残差日志副本，运行期间随步增长
    pub fn residuals(&self) -> Vec<ResidualRecord> {
        self.state.read().residuals.clone()
    }

    /// 纯数据状态快照
    pub fn summary(&self) -> JobSummary {
        let state = self.state.read();
        JobSummary {
            id: self.id,
            status: state.status,
            stats: state.stats,
            error: state.error.clone(),
            has_result: state.result.is_some(),
            created_at: self.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    /// 是否正在运行
    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    /// 请求协作取消
    ///
    /// 仅放下取消标志，不等待。标志在步边界被检查，且在下一次
    /// `create_all` 重建之前保持放下: 已取消的作业重启后会立即
    /// 再次停止。
    pub fn request_stop(&self) {
        self.run_flag.store(false, Ordering::SeqCst);
        tracing::debug!("Job {} stop requested", self.id);
    }

    /// 取消标志是否已放下
    pub fn stop_requested(&self) -> bool {
        !self.run_flag.load(Ordering::SeqCst)
    }

    /// 运行线程共享的取消标志
    pub(crate) fn run_flag(&self) -> Arc<AtomicBool> {
        self.run_flag.clone()
    }

    /// 进入 Running 并清空上一轮的全部产出
    ///
    /// 取消标志有意不在这里复位: 举旗/放旗只属于 `create_all`
    /// 与 stop 请求方。
    pub(crate) fn begin_run(&self) -> MwResult<()> {
        let mut state = self.state.write();
        if state.status == JobStatus::Running {
            return Err(MwError::already_running(format!("作业 {}", self.id)));
        }
        state.status = JobStatus::Running;
        state.stats = JobStats::default();
        state.error = None;
        state.residuals = Vec::new();
        state.result = None;
        state.started_at = Some(chrono::Utc::now());
        state.finished_at = None;
        Ok(())
    }

    /// 追加一条残差记录 (运行期间可见)
    pub(crate) fn push_residual(&self, record: ResidualRecord) {
        let mut state = self.state.write();
        state.residuals.push(record);
        state.stats.residual_records = state.residuals.len();
    }

    /// 跑满时域，带结果集结束
    pub(crate) fn finish_completed(&self, result: Arc<JobResult>, stats: JobStats) {
        let mut state = self.state.write();
        state.status = JobStatus::Completed;
        state.stats = stats;
        state.result = Some(result);
        state.finished_at = Some(chrono::Utc::now());
    }

    /// 协作取消结束; 窗口内有快照时带部分结果集
    pub(crate) fn finish_stopped(&self, result: Option<Arc<JobResult>>, stats: JobStats) {
        let mut state = self.state.write();
        state.status = JobStatus::Stopped;
        state.stats = stats;
        state.result = result;
        state.finished_at = Some(chrono::Utc::now());
    }

    /// 引擎故障结束; 已有的残差日志保留
    pub(crate) fn finish_faulted(&self, error: impl Into<String>, stats: JobStats) {
        let mut state = self.state.write();
        state.status = JobStatus::Faulted;
        state.stats = stats;
        state.error = Some(error.into());
        state.finished_at = Some(chrono::Utc::now());
    }
}

impl std::fmt::Debug for SimulationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationJob")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobTemplate, TimeConfig};
    use mw_domain::{DomainBuilder, DomainConfig, TerrainCategory, WindTunnelBuilder};
    use mw_field::SolverParams;

    fn make_job(index: usize) -> SimulationJob {
        let template = JobTemplate {
            domain: DomainConfig {
                extent: [2.0, 2.0, 2.0],
                divisions: [2, 2, 2],
                wind_speed: 10.0,
                terrain: TerrainCategory::OpenCountry,
                roughness: None,
            },
            time: TimeConfig::new(1.0, 3.0),
            mean_window: 2,
            residuals: true,
            solver: SolverParams::default(),
        };
        let config = JobConfig::from_template(&template, vec![]);
        let setup = WindTunnelBuilder.build(&config.domain, &config.obstacles).unwrap();
        SimulationJob::new(JobId::new(index), config, Arc::new(setup))
    }

    #[test]
    fn test_job_id_display_and_order() {
        assert_eq!(JobId::new(3).to_string(), "#3");
        assert!(JobId::new(0) < JobId::new(1));
        assert_eq!(JobId::from(5).index(), 5);
    }

    #[test]
    fn test_status_predicates() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Faulted.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_clean());
        assert!(!JobStatus::Stopped.is_clean());
    }

    #[test]
    fn test_new_job_starts_created_with_flag_raised() {
        let job = make_job(0);
        assert_eq!(job.status(), JobStatus::Created);
        assert!(!job.stop_requested());
        assert!(job.result().is_none());
        assert!(job.residuals().is_empty());
    }

    #[test]
    fn test_request_stop_survives_restart() {
        let job = make_job(0);
        job.request_stop();
        assert!(job.stop_requested());
        // begin_run 复位状态但不复位取消标志
        job.begin_run().unwrap();
        assert!(job.stop_requested());
        assert_eq!(job.status(), JobStatus::Running);
    }

    #[test]
    fn test_begin_run_clears_previous_outputs() {
        let job = make_job(0);
        job.begin_run().unwrap();
        job.push_residual(ResidualRecord::default());
        job.finish_faulted("boom", JobStats::default());
        assert_eq!(job.status(), JobStatus::Faulted);
        assert_eq!(job.residuals().len(), 1);
        assert_eq!(job.error().as_deref(), Some("boom"));

        job.begin_run().unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.residuals().is_empty());
        assert!(job.error().is_none());
    }

    #[test]
    fn test_begin_run_rejects_running_job() {
        let job = make_job(0);
        job.begin_run().unwrap();
        assert!(job.begin_run().is_err());
    }

    #[test]
    fn test_summary_reflects_state() {
        let job = make_job(7);
        let summary = job.summary();
        assert_eq!(summary.id, JobId::new(7));
        assert_eq!(summary.status, JobStatus::Created);
        assert!(summary.started_at.is_none());
        assert!(!summary.has_result);
    }
}
