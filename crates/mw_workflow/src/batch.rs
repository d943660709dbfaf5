// crates/mw_workflow/src/batch.rs

//! 批次编排模块
//!
//! 管理一批几何变体作业的生命周期: 统一创建、顺序执行、协作取消。
//!
//! 一次 `run_all` 把当前作业清单快照交给一条专用工作线程，按序号
//! 依次驱动；调用方拿到一张 [`RunTicket`]，在一次性完成通道上等
//! 终了报告。批次级取消只阻止"启动下一个作业"，正在运行的作业由
//! 它自己的取消标志在步边界收口。
//!
//! 编排器的全部查询 (状态、统计、结果) 走短读锁，从不被一步模拟
//! 阻塞。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use mw_domain::{DomainBuilder, EngineFactory, ObstacleBox};
use mw_foundation::prelude::*;
use mw_io::{NullResidualSink, NullSinkFactory, ResidualSink, SinkFactory};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::{JobConfig, JobTemplate};
use crate::events::{BatchEvent, EventDispatcher};
use crate::job::{JobId, JobStatus, SimulationJob};
use crate::runner::drive;

/// 批次轮次ID
///
/// 每次 `run_all` 生成一个，用于把事件与报告对应到具体一轮。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// 生成新的轮次ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 获取内部UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一轮批次的终了报告
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// 轮次ID
    pub run: RunId,
    /// 本轮启动的每个作业都 Completed 时为真
    pub success: bool,
    /// 全部作业的终态 (含因批次取消未启动的 Created 作业)
    pub outcomes: Vec<(JobId, JobStatus)>,
    /// 终态为 Stopped 或 Faulted 的作业
    pub unclean: Vec<JobId>,
    /// 本轮壁钟耗时
    pub elapsed: Duration,
}

/// 一轮批次的完成凭证
///
/// `run_all` 返回后批次在工作线程上继续执行; 凭证持有一次性
/// 完成通道的接收端，`wait` 阻塞到工作线程发来终了报告。
#[derive(Debug)]
pub struct RunTicket {
    run: RunId,
    rx: mpsc::Receiver<BatchReport>,
}

impl RunTicket {
    /// 本凭证对应的轮次ID
    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// 阻塞等待终了报告
    pub fn wait(self) -> MwResult<BatchReport> {
        Ok(self.rx.recv()?)
    }

    /// 限时等待; 超时返回 `Ok(None)`
    pub fn wait_timeout(&self, timeout: Duration) -> MwResult<Option<BatchReport>> {
        match self.rx.recv_timeout(timeout) {
            Ok(report) => Ok(Some(report)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(MwError::channel("批次工作线程在发出报告前退出"))
            }
        }
    }

    /// 非阻塞查询
    pub fn try_wait(&self) -> Option<BatchReport> {
        self.rx.try_recv().ok()
    }
}

/// 编排器与句柄共享的内部状态
#[derive(Default)]
struct Inner {
    /// 当前作业清单; 整体替换，运行中的一轮持有旧快照
    jobs: RwLock<Arc<Vec<Arc<SimulationJob>>>>,
    /// 批次级取消: 阻止启动下一个作业
    stop_flag: AtomicBool,
    /// 同一时刻至多一条工作线程
    busy: AtomicBool,
    /// 作业清单的代数，重建时自增
    generation: AtomicU64,
    /// 工作线程当前驱动的作业
    cursor: RwLock<Option<JobId>>,
    /// 事件分发器
    events: EventDispatcher,
}

impl Inner {
    fn jobs_snapshot(&self) -> Arc<Vec<Arc<SimulationJob>>> {
        self.jobs.read().clone()
    }

    fn stop_all(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let jobs = self.jobs_snapshot();
        for job in jobs.iter() {
            job.request_stop();
        }
        if !jobs.is_empty() {
            self.events.emit(BatchEvent::BatchStopRequested);
            tracing::info!("Stop requested for all {} job(s)", jobs.len());
        }
    }

    fn stop_one(&self, id: JobId) -> MwResult<()> {
        let jobs = self.jobs_snapshot();
        match jobs.iter().find(|j| j.id() == id) {
            Some(job) => {
                job.request_stop();
                Ok(())
            }
            None => Err(MwError::not_found(format!("作业 {id}"))),
        }
    }

    fn stop_current(&self) -> Option<JobId> {
        let current = *self.cursor.read();
        if let Some(id) = current {
            // 游标可能还指着已被替换的旧批次，找不到就只报告ID
            let _ = self.stop_one(id);
        }
        current
    }

    fn statuses(&self) -> Vec<(JobId, JobStatus)> {
        self.jobs_snapshot()
            .iter()
            .map(|j| (j.id(), j.status()))
            .collect()
    }

    fn job(&self, id: JobId) -> Option<Arc<SimulationJob>> {
        self.jobs_snapshot().iter().find(|j| j.id() == id).cloned()
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn current_job(&self) -> Option<JobId> {
        *self.cursor.read()
    }

    fn job_count(&self) -> usize {
        self.jobs.read().len()
    }
}

/// 批次编排器
///
/// 持有域构建器、引擎工厂与残差汇工厂三个接缝。作业清单由
/// `create_all` 整体重建; `run_all` 在专用线程上顺序执行。
pub struct BatchOrchestrator {
    inner: Arc<Inner>,
    builder: Arc<dyn DomainBuilder>,
    factory: Arc<dyn EngineFactory>,
    sinks: Arc<dyn SinkFactory>,
}

impl BatchOrchestrator {
    /// 创建编排器，残差默认不落盘
    pub fn new(
        builder: impl DomainBuilder + 'static,
        factory: impl EngineFactory + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            builder: Arc::new(builder),
            factory: Arc::new(factory),
            sinks: Arc::new(NullSinkFactory),
        }
    }

    /// 设置残差汇工厂
    pub fn with_sink_factory(mut self, sinks: impl SinkFactory + 'static) -> Self {
        self.sinks = Arc::new(sinks);
        self
    }

    /// 获取事件分发器
    pub fn events(&self) -> &EventDispatcher {
        &self.inner.events
    }

    /// 获取可跨线程使用的控制句柄
    pub fn handle(&self) -> BatchHandle {
        BatchHandle {
            inner: self.inner.clone(),
        }
    }

    /// 重建整个作业清单
    ///
    /// 每个障碍物分组生成一个作业，序号从 0 重新编号。旧清单先被
    /// 整体请求停止，再原子替换; 任何一个作业的域构建失败都让本次
    /// 重建整体失败，旧清单保持不变。
    pub fn create_all(
        &self,
        groups: &[Vec<ObstacleBox>],
        template: &JobTemplate,
    ) -> MwResult<Vec<JobId>> {
        if groups.is_empty() {
            return Err(MwError::config("几何分组为空: 批次至少需要一个障碍物分组"));
        }
        template.validate()?;

        // 旧批次先停，运行中的作业在下一个步边界退出
        self.inner.stop_all();

        // 全部构建成功后才替换清单 (全有或全无)
        let mut new_jobs = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            let setup = self.builder.build(&template.domain, group)?;
            let config = JobConfig::from_template(template, group.clone());
            new_jobs.push(Arc::new(SimulationJob::new(
                JobId::new(index),
                config,
                Arc::new(setup),
            )));
        }
        let ids: Vec<JobId> = new_jobs.iter().map(|j| j.id()).collect();

        *self.inner.jobs.write() = Arc::new(new_jobs);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *self.inner.cursor.write() = None;

        tracing::info!("Batch created: {} job(s) from shared template", ids.len());
        Ok(ids)
    }

    /// 启动一轮批次执行
    ///
    /// 清掉批次级取消标志 (作业自己的标志保持原样)，把当前清单
    /// 快照交给专用工作线程，立即返回完成凭证。已有一轮在跑时
    /// 返回 `AlreadyRunning`。
    pub fn run_all(&self) -> MwResult<RunTicket> {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MwError::already_running("批次"));
        }
        self.inner.stop_flag.store(false, Ordering::SeqCst);

        let run = RunId::new();
        let jobs = self.inner.jobs_snapshot();
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();

        let inner = self.inner.clone();
        let factory = self.factory.clone();
        let sinks = self.sinks.clone();
        let spawned = thread::Builder::new()
            .name("mw-batch-worker".into())
            .spawn(move || run_worker(inner, factory, sinks, jobs, generation, run, tx));

        match spawned {
            Ok(_) => {
                tracing::info!("Batch run {} submitted", run);
                Ok(RunTicket { run, rx })
            }
            Err(e) => {
                self.inner.busy.store(false, Ordering::SeqCst);
                Err(MwError::from(e))
            }
        }
    }

    /// 请求停止整批
    pub fn stop_all(&self) {
        self.inner.stop_all();
    }

    /// 请求停止单个作业，批次继续执行后续作业
    pub fn stop_one(&self, id: JobId) -> MwResult<()> {
        self.inner.stop_one(id)
    }

    /// 请求停止当前正在运行的作业
    pub fn stop_current(&self) -> Option<JobId> {
        self.inner.stop_current()
    }

    /// 全部作业的 (ID, 状态) 清单
    pub fn statuses(&self) -> Vec<(JobId, JobStatus)> {
        self.inner.statuses()
    }

    /// 当前作业清单快照
    pub fn jobs(&self) -> Arc<Vec<Arc<SimulationJob>>> {
        self.inner.jobs_snapshot()
    }

    /// 按ID查找作业
    pub fn job(&self, id: JobId) -> Option<Arc<SimulationJob>> {
        self.inner.job(id)
    }

    /// 作业数
    pub fn job_count(&self) -> usize {
        self.inner.job_count()
    }

    /// 是否有一轮在执行
    pub fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }

    /// 工作线程当前驱动的作业
    pub fn current_job(&self) -> Option<JobId> {
        self.inner.current_job()
    }
}

/// 批次控制句柄
///
/// 可克隆、可跨线程，常见用法是在事件监听器或信号处理里触发
/// 取消。句柄只暴露控制与查询，不能创建或启动批次。
#[derive(Clone)]
pub struct BatchHandle {
    inner: Arc<Inner>,
}

impl BatchHandle {
    /// 请求停止整批
    pub fn stop_all(&self) {
        self.inner.stop_all();
    }

    /// 请求停止单个作业
    pub fn stop_one(&self, id: JobId) -> MwResult<()> {
        self.inner.stop_one(id)
    }

    /// 请求停止当前正在运行的作业
    pub fn stop_current(&self) -> Option<JobId> {
        self.inner.stop_current()
    }

    /// 全部作业的 (ID, 状态) 清单
    pub fn statuses(&self) -> Vec<(JobId, JobStatus)> {
        self.inner.statuses()
    }

    /// 是否有一轮在执行
    pub fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }

    /// 工作线程当前驱动的作业
    pub fn current_job(&self) -> Option<JobId> {
        self.inner.current_job()
    }
}

/// 工作线程主体: 顺序驱动一份清单快照
fn run_worker(
    inner: Arc<Inner>,
    factory: Arc<dyn EngineFactory>,
    sinks: Arc<dyn SinkFactory>,
    jobs: Arc<Vec<Arc<SimulationJob>>>,
    generation: u64,
    run: RunId,
    tx: mpsc::Sender<BatchReport>,
) {
    let started = Instant::now();
    inner.events.emit(BatchEvent::BatchStarted {
        run,
        jobs: jobs.len(),
    });

    let mut success = true;
    for job in jobs.iter() {
        // 批次级取消: 不再启动后续作业
        if inner.stop_flag.load(Ordering::SeqCst) {
            tracing::info!("Batch run {} cancelled, skipping remaining jobs", run);
            break;
        }
        // 清单在运行期间被重建: 放弃旧清单的剩余作业
        if inner.generation.load(Ordering::SeqCst) != generation {
            tracing::warn!("Batch run {} superseded by re-create, aborting", run);
            break;
        }

        *inner.cursor.write() = Some(job.id());
        inner.events.emit(BatchEvent::JobStarted { job: job.id() });

        let mut sink = make_sink(sinks.as_ref(), job);
        let status = drive(job, factory.as_ref(), sink.as_mut());

        let stats = job.stats();
        match status {
            JobStatus::Completed => {
                inner.events.emit(BatchEvent::JobCompleted {
                    job: job.id(),
                    steps: stats.steps,
                    duration_secs: stats.elapsed.as_secs_f64(),
                });
            }
            JobStatus::Stopped => {
                success = false;
                inner.events.emit(BatchEvent::JobStopped {
                    job: job.id(),
                    steps: stats.steps,
                });
            }
            JobStatus::Faulted => {
                success = false;
                inner.events.emit(BatchEvent::JobFaulted {
                    job: job.id(),
                    error: job.error().unwrap_or_default(),
                });
            }
            JobStatus::Created | JobStatus::Running => {}
        }
    }
    *inner.cursor.write() = None;

    let outcomes: Vec<(JobId, JobStatus)> = jobs.iter().map(|j| (j.id(), j.status())).collect();
    let unclean: Vec<JobId> = outcomes
        .iter()
        .filter(|(_, s)| matches!(s, JobStatus::Stopped | JobStatus::Faulted))
        .map(|(id, _)| *id)
        .collect();
    let elapsed = started.elapsed();

    inner.busy.store(false, Ordering::SeqCst);
    inner.events.emit(BatchEvent::BatchFinished {
        run,
        success,
        duration_secs: elapsed.as_secs_f64(),
    });
    tracing::info!(
        "Batch run {} finished in {:.2}s: success={}, {} unclean job(s)",
        run,
        elapsed.as_secs_f64(),
        success,
        unclean.len()
    );

    let report = BatchReport {
        run,
        success,
        outcomes,
        unclean,
        elapsed,
    };
    // 接收端可能已放弃等待，完成通知尽力而为
    if tx.send(report).is_err() {
        tracing::debug!("Batch run {} report receiver dropped", run);
    }
}

/// 为作业派生残差汇; 关闭残差或派生失败时退回空汇
fn make_sink(sinks: &dyn SinkFactory, job: &SimulationJob) -> Box<dyn ResidualSink> {
    if !job.config().residuals {
        return Box::new(NullResidualSink);
    }
    match sinks.create(job.id().index()) {
        Ok(sink) => sink,
        Err(e) => {
            tracing::warn!(
                "Job {} residual sink creation failed, falling back to null sink: {}",
                job.id(),
                e
            );
            Box::new(NullResidualSink)
        }
    }
}
