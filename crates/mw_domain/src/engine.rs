// crates/mw_domain/src/engine.rs

//! 引擎构建接缝
//!
//! 每个作业每次启动都由 [`EngineFactory`] 新建一个引擎实例，
//! 实例在作业之间从不共享，批次若将来并行化也无需协调。
//!
//! [`RelaxationEngine`] 是参考实现: 一阶松弛逼近入流目标场，
//! 每步结束把固体单元重新置零。它只为让编排层可以端到端
//! 运行与测试，不代表任何数值方法。

use std::sync::Arc;

use mw_foundation::prelude::*;
use mw_field::{FieldProbe, FlowEngine, FlowField, SolverParams, StaggeredProbe};
use ndarray::Zip;
use tracing::trace;

use crate::builder::DomainSetup;
use crate::obstacle::ObstacleGrid;

/// 引擎构建接缝
pub trait EngineFactory: Send + Sync {
    /// 工厂名称，用于日志
    fn name(&self) -> &str {
        "factory"
    }

    /// 为一次作业运行构建全新引擎
    fn create(&self, setup: &DomainSetup, params: &SolverParams) -> MwResult<Box<dyn FlowEngine>>;
}

/// 一阶松弛参考引擎
pub struct RelaxationEngine {
    target: FlowField,
    obstacles: Arc<ObstacleGrid>,
    probe: StaggeredProbe,
    rate: f64,
    verbose: bool,
}

impl RelaxationEngine {
    /// 把固体单元的压力与邻接面速度置零
    fn clamp_solids(&self, field: &mut FlowField) {
        let (px, py, pz) = self.obstacles.padded_dims();
        for pi in 0..px {
            for pj in 0..py {
                for pk in 0..pz {
                    if !self.obstacles.is_solid_padded(pi, pj, pk) {
                        continue;
                    }
                    field.p[[pi, pj, pk]] = 0.0;
                    // 六张邻接面
                    if pi > 0 {
                        field.u[[pi - 1, pj, pk]] = 0.0;
                    }
                    if pi < px - 1 {
                        field.u[[pi, pj, pk]] = 0.0;
                    }
                    if pj > 0 {
                        field.v[[pi, pj - 1, pk]] = 0.0;
                    }
                    if pj < py - 1 {
                        field.v[[pi, pj, pk]] = 0.0;
                    }
                    if pk > 0 {
                        field.w[[pi, pj, pk - 1]] = 0.0;
                    }
                    if pk < pz - 1 {
                        field.w[[pi, pj, pk]] = 0.0;
                    }
                }
            }
        }
    }
}

impl FlowEngine for RelaxationEngine {
    fn name(&self) -> &str {
        "relaxation"
    }

    fn advance(&mut self, field: &mut FlowField, time: f64, dt: f64) -> MwResult<()> {
        let factor = (self.rate * dt).min(1.0);
        Zip::from(&mut field.p)
            .and(&self.target.p)
            .for_each(|x, t| *x += factor * (t - *x));
        Zip::from(&mut field.u)
            .and(&self.target.u)
            .for_each(|x, t| *x += factor * (t - *x));
        Zip::from(&mut field.v)
            .and(&self.target.v)
            .for_each(|x, t| *x += factor * (t - *x));
        Zip::from(&mut field.w)
            .and(&self.target.w)
            .for_each(|x, t| *x += factor * (t - *x));

        self.clamp_solids(field);

        if !field.all_finite() {
            return Err(MwError::engine(format!("t = {time} 处场出现非有限值")));
        }
        if self.verbose {
            trace!("松弛步完成: t={time}, dt={dt}, factor={factor}");
        }
        Ok(())
    }

    fn probe(&self) -> &dyn FieldProbe {
        &self.probe
    }
}

/// 松弛引擎工厂
#[derive(Debug, Clone, Copy)]
pub struct RelaxationFactory {
    /// 松弛速率 [1/s]
    pub rate: f64,
}

impl Default for RelaxationFactory {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl EngineFactory for RelaxationFactory {
    fn name(&self) -> &str {
        "relaxation"
    }

    fn create(&self, setup: &DomainSetup, params: &SolverParams) -> MwResult<Box<dyn FlowEngine>> {
        if !(self.rate > 0.0 && self.rate.is_finite()) {
            return Err(MwError::config(format!("松弛速率必须为正, 实际 {}", self.rate)));
        }
        Ok(Box::new(RelaxationEngine {
            target: setup.initial.clone(),
            obstacles: setup.obstacles.clone(),
            probe: StaggeredProbe::new(setup.spec),
            rate: self.rate,
            verbose: params.verbose,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DomainBuilder, DomainConfig, WindTunnelBuilder};
    use crate::obstacle::ObstacleBox;
    use crate::terrain::TerrainCategory;

    fn setup_with(boxes: &[ObstacleBox]) -> DomainSetup {
        let cfg = DomainConfig {
            extent: [4.0, 4.0, 4.0],
            divisions: [2, 2, 2],
            wind_speed: 8.0,
            terrain: TerrainCategory::OpenCountry,
            roughness: None,
        };
        WindTunnelBuilder.build(&cfg, boxes).unwrap()
    }

    #[test]
    fn test_relaxation_moves_toward_target() {
        let setup = setup_with(&[]);
        let mut engine = RelaxationFactory { rate: 0.5 }
            .create(&setup, &SolverParams::default())
            .unwrap();
        let mut field = FlowField::zeros(&setup.spec);
        // factor = 0.5: 一步走到目标的一半
        engine.advance(&mut field, 0.0, 1.0).unwrap();
        let target = setup.initial.u[[0, 1, 2]];
        assert!(target > 0.0);
        assert!((field.u[[0, 1, 2]] - 0.5 * target).abs() < 1e-12);
    }

    #[test]
    fn test_solids_stay_zero() {
        let setup = setup_with(&[ObstacleBox::new([0.0; 3], [2.0; 3])]);
        let mut engine = RelaxationFactory::default()
            .create(&setup, &SolverParams::default())
            .unwrap();
        let mut field = FlowField::zeros(&setup.spec);
        field.p.fill(3.0);
        engine.advance(&mut field, 0.0, 10.0).unwrap();
        // 固体单元 (0,0,0) = 带层 (1,1,1)
        assert_eq!(field.p[[1, 1, 1]], 0.0);
        assert_eq!(field.u[[0, 1, 1]], 0.0);
        assert_eq!(field.u[[1, 1, 1]], 0.0);
    }

    #[test]
    fn test_nonfinite_field_faults() {
        let setup = setup_with(&[]);
        let mut engine = RelaxationFactory::default()
            .create(&setup, &SolverParams::default())
            .unwrap();
        let mut field = FlowField::zeros(&setup.spec);
        field.p[[0, 0, 0]] = f64::NAN;
        let err = engine.advance(&mut field, 1.0, 1.0).unwrap_err();
        assert!(err.is_engine_fault());
    }

    #[test]
    fn test_factory_rejects_bad_rate() {
        let setup = setup_with(&[]);
        let res = RelaxationFactory { rate: 0.0 }.create(&setup, &SolverParams::default());
        assert!(res.is_err());
    }
}
