// crates/mw_workflow/src/events.rs

//! 事件系统模块
//!
//! 批次与作业生命周期事件的定义和分发。事件在工作线程上同步
//! 分发，监听器回调里允许再次触发编排操作 (如收到 `JobStarted`
//! 后立即 `stop_all`)。

use parking_lot::RwLock;
use std::sync::Arc;

use crate::batch::RunId;
use crate::job::JobId;

/// 批次事件
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// 一轮批次开始
    BatchStarted {
        /// 本轮ID
        run: RunId,
        /// 批次作业数
        jobs: usize,
    },
    /// 作业已开始
    JobStarted {
        /// 作业ID
        job: JobId,
    },
    /// 作业跑满时域完成
    JobCompleted {
        /// 作业ID
        job: JobId,
        /// 总步数
        steps: u64,
        /// 壁钟耗时 (秒)
        duration_secs: f64,
    },
    /// 作业被协作取消
    JobStopped {
        /// 作业ID
        job: JobId,
        /// 已执行步数
        steps: u64,
    },
    /// 作业因引擎故障终止
    JobFaulted {
        /// 作业ID
        job: JobId,
        /// 故障信息
        error: String,
    },
    /// 收到批次级取消请求
    BatchStopRequested,
    /// 一轮批次结束
    BatchFinished {
        /// 本轮ID
        run: RunId,
        /// 每个已启动作业都 Completed 时为真
        success: bool,
        /// 壁钟耗时 (秒)
        duration_secs: f64,
    },
}

impl BatchEvent {
    /// 获取事件对应的作业ID (批次级事件为 None)
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobStarted { job } => Some(*job),
            Self::JobCompleted { job, .. } => Some(*job),
            Self::JobStopped { job, .. } => Some(*job),
            Self::JobFaulted { job, .. } => Some(*job),
            Self::BatchStarted { .. } | Self::BatchStopRequested | Self::BatchFinished { .. } => {
                None
            }
        }
    }

    /// 获取事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "BatchStarted",
            Self::JobStarted { .. } => "JobStarted",
            Self::JobCompleted { .. } => "JobCompleted",
            Self::JobStopped { .. } => "JobStopped",
            Self::JobFaulted { .. } => "JobFaulted",
            Self::BatchStopRequested => "BatchStopRequested",
            Self::BatchFinished { .. } => "BatchFinished",
        }
    }
}

/// 事件监听器trait
pub trait EventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &BatchEvent);

    /// 获取监听器名称 (用于调试)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// 函数式事件监听器
pub struct FnListener<F>
where
    F: Fn(&BatchEvent) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&BatchEvent) + Send + Sync,
{
    /// 创建函数式监听器
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&BatchEvent) + Send + Sync,
{
    fn on_event(&self, event: &BatchEvent) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 日志事件监听器
pub struct LoggingListener {
    /// 日志前缀
    prefix: String,
    /// 是否详细输出
    verbose: bool,
}

impl LoggingListener {
    /// 创建日志监听器
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            verbose: false,
        }
    }

    /// 设置详细模式
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl EventListener for LoggingListener {
    fn on_event(&self, event: &BatchEvent) {
        let msg = match event {
            BatchEvent::BatchStarted { run, jobs } => {
                format!("Batch {} started with {} job(s)", run, jobs)
            }
            BatchEvent::JobStarted { job } => {
                format!("Job {} started", job)
            }
            BatchEvent::JobCompleted {
                job,
                steps,
                duration_secs,
            } => {
                format!("Job {} completed in {:.2}s ({} steps)", job, duration_secs, steps)
            }
            BatchEvent::JobStopped { job, steps } => {
                format!("Job {} stopped after {} steps", job, steps)
            }
            BatchEvent::JobFaulted { job, error } => {
                format!("Job {} faulted: {}", job, error)
            }
            BatchEvent::BatchFinished {
                run,
                success,
                duration_secs,
            } => {
                format!(
                    "Batch {} finished in {:.2}s (success={})",
                    run, duration_secs, success
                )
            }
            _ if self.verbose => {
                format!("{:?}", event)
            }
            _ => return,
        };

        tracing::info!("{}: {}", self.prefix, msg);
    }

    fn name(&self) -> &str {
        "LoggingListener"
    }
}

/// 事件分发器
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    /// 创建新的事件分发器
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 添加监听器
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let name = listener.name().to_string();
        self.listeners.write().push(listener);
        tracing::debug!("Added event listener: {}", name);
    }

    /// 添加函数式监听器
    pub fn add_fn_listener<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&BatchEvent) + Send + Sync + 'static,
    {
        let listener = Arc::new(FnListener::new(name, handler));
        self.add_listener(listener);
    }

    /// 移除监听器
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// 清除所有监听器
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// 分发事件
    ///
    /// 先在锁内拷出监听器列表再回调，监听器因此可以在回调里
    /// 触发新的 emit 或增删监听器。
    pub fn emit(&self, event: BatchEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().clone();

        tracing::trace!("Emitting event: {}", event.name());

        for listener in &listeners {
            listener.on_event(&event);
        }
    }

    /// 获取监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_dispatcher_counts_calls() {
        let dispatcher = EventDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        dispatcher.add_fn_listener("test", move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.emit(BatchEvent::JobStarted {
            job: JobId::new(0),
        });
        dispatcher.emit(BatchEvent::JobCompleted {
            job: JobId::new(0),
            steps: 100,
            duration_secs: 1.0,
        });

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_event_job_id_and_name() {
        let event = BatchEvent::JobStopped {
            job: JobId::new(2),
            steps: 5,
        };
        assert_eq!(event.job_id(), Some(JobId::new(2)));
        assert_eq!(event.name(), "JobStopped");

        assert_eq!(BatchEvent::BatchStopRequested.job_id(), None);
    }

    #[test]
    fn test_reentrant_emit_from_listener() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner = dispatcher.clone();
        let counter_clone = counter.clone();
        dispatcher.add_fn_listener("reentrant", move |event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            // 回调里再发一个事件不能死锁
            if matches!(event, BatchEvent::JobStarted { .. }) {
                inner.emit(BatchEvent::BatchStopRequested);
            }
        });

        dispatcher.emit(BatchEvent::JobStarted {
            job: JobId::new(0),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
