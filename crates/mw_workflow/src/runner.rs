// crates/mw_workflow/src/runner.rs

//! 作业运行器模块
//!
//! 驱动单个作业的固定步长主循环。循环每迭代一次:
//!
//! 1. 在步边界检查取消标志
//! 2. 保存上一步场副本
//! 3. 调用引擎推进一步
//! 4. `t > dt` 起记录逐步残差
//! 5. `t >= t_end - m*dt` 起把场快照推入平均窗口
//! 6. `t += dt`
//!
//! 重量运行状态 (场、副本、快照环、引擎) 全部在本函数栈上，
//! 随返回释放；作业对象只收到轻量的状态与产出。

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use mw_domain::EngineFactory;
use mw_field::{FieldSnapshot, ResidualRecord, SnapshotRing};
use mw_io::ResidualSink;

use crate::job::{JobStats, JobStatus, SimulationJob};
use crate::results::materialize;

/// 驱动一个作业从启动到终态，返回最终状态
///
/// 任何引擎错误都让本作业转入 Faulted，不向上传播; 残差汇
/// 写入失败只计数，不影响作业结果。
pub(crate) fn drive(
    job: &SimulationJob,
    factory: &dyn EngineFactory,
    sink: &mut dyn ResidualSink,
) -> JobStatus {
    if let Err(e) = job.begin_run() {
        tracing::warn!("Job {} cannot start: {}", job.id(), e);
        return job.status();
    }

    let started = Instant::now();
    let setup = job.setup().clone();
    let config = job.config();
    let dt = config.time.dt;
    let t_end = config.time.t_end;

    let mut stats = JobStats::default();

    // 引擎构建失败与推进失败同样处理: 本作业 Faulted，批次继续
    let mut engine = match factory.create(&setup, &config.solver) {
        Ok(engine) => engine,
        Err(e) => {
            stats.elapsed = started.elapsed();
            tracing::error!("Job {} faulted: {}", job.id(), e);
            job.finish_faulted(e.to_string(), stats);
            return JobStatus::Faulted;
        }
    };

    tracing::info!(
        "Job {} started: engine={}, {} cells, {} step(s) expected",
        job.id(),
        engine.name(),
        setup.spec.cell_count(),
        config.time.step_hint()
    );

    let mut field = setup.initial.clone();
    let mut prev = field.clone();
    let mut ring = SnapshotRing::new(config.mean_window);
    let window_start = t_end - config.mean_window as f64 * dt;
    let flag = job.run_flag();

    let mut t = 0.0_f64;
    let mut stopped = false;
    let mut fault: Option<String> = None;

    // dt > t_end 是退化情形: 零步，立即完成
    if dt <= t_end {
        while t < t_end {
            // 取消标志只在步边界检查
            if !flag.load(Ordering::SeqCst) {
                stopped = true;
                break;
            }

            prev.copy_from(&field);
            if let Err(e) = engine.advance(&mut field, t, dt) {
                fault = Some(e.to_string());
                break;
            }
            stats.steps += 1;

            // 首步没有前驱，残差从第二步起记录
            if config.residuals && t > dt {
                let record = ResidualRecord::between(&prev, &field, t);
                job.push_residual(record);
                stats.residual_records += 1;
                if let Err(e) = sink.append(&record) {
                    stats.sink_failures += 1;
                    tracing::warn!("Job {} residual sink append failed: {}", job.id(), e);
                }
            }

            if t >= window_start {
                ring.push(FieldSnapshot::capture(t, field.clone()));
                stats.snapshots = ring.len();
            }

            t += dt;
        }
    }

    if let Err(e) = sink.flush() {
        stats.sink_failures += 1;
        tracing::warn!("Job {} residual sink flush failed: {}", job.id(), e);
    }
    stats.elapsed = started.elapsed();

    if let Some(error) = fault {
        tracing::error!("Job {} faulted at t={}: {}", job.id(), t, error);
        job.finish_faulted(error, stats);
        return JobStatus::Faulted;
    }

    // 末场: 窗口非空取窗口平均，否则取引擎末态
    let averaged_over = ring.len();
    let averaged = ring.mean();

    if stopped {
        let result = averaged.map(|mean| {
            Arc::new(materialize(
                &setup.spec,
                &setup.obstacles,
                &mean,
                engine.probe(),
                t,
                averaged_over,
            ))
        });
        tracing::info!(
            "Job {} stopped after {} step(s) in {:.2}s",
            job.id(),
            stats.steps,
            stats.elapsed.as_secs_f64()
        );
        job.finish_stopped(result, stats);
        JobStatus::Stopped
    } else {
        let final_field = averaged.unwrap_or(field);
        let result = Arc::new(materialize(
            &setup.spec,
            &setup.obstacles,
            &final_field,
            engine.probe(),
            t,
            averaged_over,
        ));
        tracing::info!(
            "Job {} completed: {} step(s) in {:.2}s",
            job.id(),
            stats.steps,
            stats.elapsed.as_secs_f64()
        );
        job.finish_completed(result, stats);
        JobStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, JobTemplate, TimeConfig};
    use crate::job::JobId;
    use mw_domain::{
        DomainBuilder, DomainConfig, DomainSetup, ObstacleBox, TerrainCategory, WindTunnelBuilder,
    };
    use mw_field::{FieldProbe, FlowEngine, FlowField, SolverParams, StaggeredProbe};
    use mw_foundation::prelude::*;
    use mw_io::{MemoryResidualSink, NullResidualSink};
    use std::sync::atomic::AtomicBool;

    fn make_job(dt: f64, t_end: f64, mean_window: usize, boxes: Vec<ObstacleBox>) -> SimulationJob {
        let template = JobTemplate {
            domain: DomainConfig {
                extent: [2.0, 2.0, 2.0],
                divisions: [2, 2, 2],
                wind_speed: 10.0,
                terrain: TerrainCategory::OpenCountry,
                roughness: None,
            },
            time: TimeConfig::new(dt, t_end),
            mean_window,
            residuals: true,
            solver: SolverParams::default(),
        };
        let config = JobConfig::from_template(&template, boxes);
        let setup = WindTunnelBuilder.build(&config.domain, &config.obstacles).unwrap();
        SimulationJob::new(JobId::new(0), config, Arc::new(setup))
    }

    /// 每步把压力场整体填成 time + 1，步值可从结果里读回
    struct StepEngine {
        probe: StaggeredProbe,
    }

    impl FlowEngine for StepEngine {
        fn advance(&mut self, field: &mut FlowField, time: f64, _dt: f64) -> MwResult<()> {
            field.p.fill(time + 1.0);
            Ok(())
        }

        fn probe(&self) -> &dyn FieldProbe {
            &self.probe
        }
    }

    struct StepFactory;

    impl EngineFactory for StepFactory {
        fn create(
            &self,
            setup: &DomainSetup,
            _params: &SolverParams,
        ) -> MwResult<Box<dyn FlowEngine>> {
            Ok(Box::new(StepEngine {
                probe: StaggeredProbe::new(setup.spec),
            }))
        }
    }

    /// 推进 stop_after 步后放下作业自己的取消标志
    struct StopAtEngine {
        probe: StaggeredProbe,
        flag: Arc<AtomicBool>,
        stop_after: u64,
        done: u64,
    }

    impl FlowEngine for StopAtEngine {
        fn advance(&mut self, field: &mut FlowField, time: f64, _dt: f64) -> MwResult<()> {
            field.p.fill(time + 1.0);
            self.done += 1;
            if self.done == self.stop_after {
                self.flag.store(false, Ordering::SeqCst);
            }
            Ok(())
        }

        fn probe(&self) -> &dyn FieldProbe {
            &self.probe
        }
    }

    struct StopAtFactory {
        flag: Arc<AtomicBool>,
        stop_after: u64,
    }

    impl EngineFactory for StopAtFactory {
        fn create(
            &self,
            setup: &DomainSetup,
            _params: &SolverParams,
        ) -> MwResult<Box<dyn FlowEngine>> {
            Ok(Box::new(StopAtEngine {
                probe: StaggeredProbe::new(setup.spec),
                flag: self.flag.clone(),
                stop_after: self.stop_after,
                done: 0,
            }))
        }
    }

    /// 在指定模拟时刻返回引擎错误
    struct FaultFactory {
        fail_at: f64,
    }

    struct FaultEngine {
        probe: StaggeredProbe,
        fail_at: f64,
    }

    impl FlowEngine for FaultEngine {
        fn advance(&mut self, field: &mut FlowField, time: f64, _dt: f64) -> MwResult<()> {
            if time >= self.fail_at {
                return Err(MwError::engine("divergence detected"));
            }
            field.p.fill(time + 1.0);
            Ok(())
        }

        fn probe(&self) -> &dyn FieldProbe {
            &self.probe
        }
    }

    impl EngineFactory for FaultFactory {
        fn create(
            &self,
            setup: &DomainSetup,
            _params: &SolverParams,
        ) -> MwResult<Box<dyn FlowEngine>> {
            Ok(Box::new(FaultEngine {
                probe: StaggeredProbe::new(setup.spec),
                fail_at: self.fail_at,
            }))
        }
    }

    /// 每次 append 都失败的汇
    struct FailingSink;

    impl ResidualSink for FailingSink {
        fn append(&mut self, _record: &ResidualRecord) -> MwResult<()> {
            Err(MwError::io("disk full"))
        }
    }

    #[test]
    fn test_completed_counts_and_tail_window() {
        // dt=1, t_end=5, m=2: 5 步, 快照 t=3,4, 残差 t=2,3,4
        let job = make_job(1.0, 5.0, 2, vec![]);
        let (mut sink, store) = MemoryResidualSink::shared();

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Completed);

        let stats = job.stats();
        assert_eq!(stats.steps, 5);
        assert_eq!(stats.snapshots, 2);
        assert_eq!(stats.residual_records, 3);
        assert_eq!(stats.sink_failures, 0);

        let times: Vec<f64> = job.residuals().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
        assert_eq!(store.lock().len(), 3);

        // 窗口平均: 快照里 p = 4 与 p = 5，均值 4.5
        let result = job.result().unwrap();
        assert_eq!(result.averaged_over, 2);
        assert_eq!(result.end_time, 5.0);
        assert!((result.cells.pressure[[0, 0, 0]] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_horizon_completes_with_zero_steps() {
        let job = make_job(10.0, 5.0, 2, vec![]);
        let mut sink = NullResidualSink;

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(job.stats().steps, 0);
        assert!(job.residuals().is_empty());

        // 末态 = 初始场
        let result = job.result().unwrap();
        assert_eq!(result.averaged_over, 0);
        assert_eq!(result.end_time, 0.0);
        assert_eq!(result.cells.pressure[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_lowered_flag_skips_loop_entirely() {
        let job = make_job(1.0, 5.0, 2, vec![]);
        job.request_stop();
        let mut sink = NullResidualSink;

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Stopped);
        assert_eq!(job.stats().steps, 0);
        // 窗口为空: 没有结果集
        assert!(job.result().is_none());
    }

    #[test]
    fn test_midrun_stop_keeps_partial_window() {
        let job = make_job(1.0, 5.0, 10, vec![]);
        let factory = StopAtFactory {
            flag: job.run_flag(),
            stop_after: 2,
        };
        let mut sink = NullResidualSink;

        let status = drive(&job, &factory, &mut sink);
        assert_eq!(status, JobStatus::Stopped);
        assert_eq!(job.stats().steps, 2);

        // m=10 覆盖全程: 快照 p=1, p=2，部分结果为其均值
        let result = job.result().unwrap();
        assert_eq!(result.averaged_over, 2);
        assert_eq!(result.end_time, 2.0);
        assert!((result.cells.pressure[[0, 0, 0]] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_engine_fault_keeps_residual_log() {
        let job = make_job(1.0, 5.0, 2, vec![]);
        let factory = FaultFactory { fail_at: 3.0 };
        let mut sink = NullResidualSink;

        let status = drive(&job, &factory, &mut sink);
        assert_eq!(status, JobStatus::Faulted);
        assert_eq!(job.stats().steps, 3);
        assert!(job.error().unwrap().contains("divergence"));
        assert!(job.result().is_none());
        // 故障前已记录的残差保留 (t=2)
        assert_eq!(job.residuals().len(), 1);
        assert_eq!(job.residuals()[0].time, 2.0);
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let job = make_job(1.0, 5.0, 2, vec![]);
        let mut sink = FailingSink;

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(job.stats().sink_failures, 3);
        // 内存日志不受汇失败影响
        assert_eq!(job.residuals().len(), 3);
    }

    #[test]
    fn test_rerun_restarts_from_scratch() {
        let job = make_job(1.0, 5.0, 2, vec![]);
        let mut sink = NullResidualSink;

        drive(&job, &StepFactory, &mut sink);
        let first = job.result().unwrap();

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(job.stats().steps, 5);
        assert_eq!(job.residuals().len(), 3);

        // 重跑得到新结果对象，不是续算
        let second = job.result().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_obstacle_cells_zero_in_result() {
        // 障碍盒覆盖单元 (0,0,0)
        let job = make_job(1.0, 3.0, 0, vec![ObstacleBox::new([0.0; 3], [1.0; 3])]);
        let mut sink = NullResidualSink;

        let status = drive(&job, &StepFactory, &mut sink);
        assert_eq!(status, JobStatus::Completed);

        // m=0: 平均关闭，末态直接物化
        let result = job.result().unwrap();
        assert_eq!(result.averaged_over, 0);
        assert_eq!(result.cells.pressure[[0, 0, 0]], 0.0);
        assert!(result.cells.pressure[[1, 1, 1]] > 0.0);
    }
}
