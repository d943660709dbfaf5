// crates/mw_field/src/probe.rs

//! 最近单元参考采样器
//!
//! 把查询点收拢到所在内部单元，压力取该单元中心值，
//! 速度取六个面分量的平均。不做插值，精度要求高的场合
//! 应换用外部引擎自带的采样实现。

use glam::DVec3;

use crate::engine::{FieldProbe, FieldSample};
use crate::field::FlowField;
use crate::grid::GridSpec;

/// 最近单元采样器
#[derive(Debug, Clone, Copy)]
pub struct StaggeredProbe {
    spec: GridSpec,
}

impl StaggeredProbe {
    /// 绑定网格规格
    pub fn new(spec: GridSpec) -> Self {
        Self { spec }
    }

    /// 网格规格
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }
}

impl FieldProbe for StaggeredProbe {
    fn sample(&self, field: &FlowField, point: DVec3) -> FieldSample {
        let (i, j, k) = self.spec.clamped_cell_of(point);
        FieldSample {
            pressure: field.cell_pressure(i, j, k),
            velocity: field.cell_velocity(i, j, k),
        }
    }
}
