// crates/mw_workflow/src/results.rs

//! 结果物化模块
//!
//! 把内部交错场翻译成消费方可直接使用的规则点阵: 单元中心与
//! 节点两套，每点一条标量压力 + 一条速度矢量，固体点强制为零。
//! 两套点阵走同一条采样通道，节点的固体判定由分类格网按
//! 宿主单元钳制规则给出，不需要对边界面额外分支。
//!
//! 物化只在作业终态发生一次；大点阵用 rayon 并行采样。

use std::sync::Arc;

use glam::DVec3;
use mw_domain::ObstacleGrid;
use mw_field::{FieldProbe, FieldSample, FlowField, GridSpec};
use ndarray::Array3;
use rayon::prelude::*;

/// 并行采样阈值 (点数)
const PARALLEL_THRESHOLD: usize = 32_768;

/// 规则点阵上的采样结果
#[derive(Debug, Clone)]
pub struct SampledGrid {
    /// 压力 [Pa]
    pub pressure: Array3<f64>,
    /// 速度 [m/s]
    pub velocity: Array3<DVec3>,
}

impl SampledGrid {
    /// 点阵维度
    pub fn dims(&self) -> (usize, usize, usize) {
        self.pressure.dim()
    }

    /// 点数
    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    /// 是否为空点阵
    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    /// 逐点速度大小 [m/s]
    pub fn speed(&self) -> Array3<f64> {
        self.velocity.mapv(|v| v.length())
    }
}

/// 作业结果集
///
/// Completed 作业必有一份；Stopped 作业仅当平均窗口非空时有
/// 部分结果；Faulted 作业没有。
#[derive(Debug, Clone)]
pub struct JobResult {
    /// 结果对应的模拟时刻 [s]
    pub end_time: f64,
    /// 参与平均的快照条数 (0 = 直接取末态场)
    pub averaged_over: usize,
    /// 网格几何
    pub spec: GridSpec,
    /// 单元中心点阵 (nx, ny, nz)
    pub cells: SampledGrid,
    /// 节点点阵 (nx+1, ny+1, nz+1)
    pub nodes: SampledGrid,
    /// 障碍物分类格网
    pub obstacles: Arc<ObstacleGrid>,
}

/// 在全部单元中心与节点上采样，生成结果集
pub fn materialize(
    spec: &GridSpec,
    obstacles: &Arc<ObstacleGrid>,
    field: &FlowField,
    probe: &dyn FieldProbe,
    end_time: f64,
    averaged_over: usize,
) -> JobResult {
    let cells = sample_lattice(
        spec.cell_dims(),
        field,
        probe,
        |i, j, k| obstacles.cell_is_solid(i, j, k),
        |i, j, k| spec.cell_center(i, j, k),
    );
    let nodes = sample_lattice(
        spec.node_dims(),
        field,
        probe,
        |i, j, k| obstacles.node_is_solid(i, j, k),
        |i, j, k| spec.node_point(i, j, k),
    );
    JobResult {
        end_time,
        averaged_over,
        spec: *spec,
        cells,
        nodes,
        obstacles: obstacles.clone(),
    }
}

/// 单套点阵的采样通道
fn sample_lattice(
    dims: (usize, usize, usize),
    field: &FlowField,
    probe: &dyn FieldProbe,
    solid: impl Fn(usize, usize, usize) -> bool + Sync,
    point: impl Fn(usize, usize, usize) -> DVec3 + Sync,
) -> SampledGrid {
    let (nx, ny, nz) = dims;
    let count = nx * ny * nz;

    // 行主序线性下标 -> (i, j, k)
    let decode = |idx: usize| (idx / (ny * nz), (idx / nz) % ny, idx % nz);
    let sample_one = |idx: usize| -> FieldSample {
        let (i, j, k) = decode(idx);
        if solid(i, j, k) {
            FieldSample::zero()
        } else {
            probe.sample(field, point(i, j, k))
        }
    };

    let samples: Vec<FieldSample> = if count >= PARALLEL_THRESHOLD {
        (0..count).into_par_iter().map(sample_one).collect()
    } else {
        (0..count).map(sample_one).collect()
    };

    let mut pressure = Array3::zeros(dims);
    let mut velocity = Array3::from_elem(dims, DVec3::ZERO);
    for (idx, s) in samples.into_iter().enumerate() {
        let (i, j, k) = decode(idx);
        pressure[[i, j, k]] = s.pressure;
        velocity[[i, j, k]] = s.velocity;
    }

    SampledGrid { pressure, velocity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mw_domain::ObstacleBox;
    use mw_field::StaggeredProbe;

    fn spec() -> GridSpec {
        GridSpec::from_extent([3.0, 2.0, 2.0], [3, 2, 2]).unwrap()
    }

    fn grid_for(boxes: &[ObstacleBox]) -> Arc<ObstacleGrid> {
        Arc::new(ObstacleGrid::build(&spec(), boxes))
    }

    #[test]
    fn test_materialize_dims() {
        let spec = spec();
        let obstacles = grid_for(&[]);
        let field = FlowField::zeros(&spec);
        let probe = StaggeredProbe::new(spec);

        let result = materialize(&spec, &obstacles, &field, &probe, 5.0, 2);
        assert_eq!(result.cells.dims(), (3, 2, 2));
        assert_eq!(result.nodes.dims(), (4, 3, 3));
        assert_eq!(result.cells.len(), 12);
        assert_eq!(result.nodes.len(), 36);
        assert_eq!(result.end_time, 5.0);
        assert_eq!(result.averaged_over, 2);
    }

    #[test]
    fn test_fluid_values_flow_through() {
        let spec = spec();
        let obstacles = grid_for(&[]);
        let mut field = FlowField::zeros(&spec);
        field.p.fill(7.0);
        field.u.fill(2.0);
        let probe = StaggeredProbe::new(spec);

        let result = materialize(&spec, &obstacles, &field, &probe, 1.0, 0);
        assert_eq!(result.cells.pressure[[1, 0, 1]], 7.0);
        assert_eq!(result.cells.velocity[[1, 0, 1]].x, 2.0);
        assert_eq!(result.nodes.pressure[[2, 1, 1]], 7.0);
        assert_eq!(result.cells.speed()[[1, 0, 1]], 2.0);
    }

    #[test]
    fn test_solid_points_forced_to_zero() {
        let spec = spec();
        // 覆盖单元 (0,0,0) 的障碍盒
        let obstacles = grid_for(&[ObstacleBox::new([0.0; 3], [1.0; 3])]);
        let mut field = FlowField::zeros(&spec);
        field.p.fill(7.0);
        field.u.fill(2.0);
        let probe = StaggeredProbe::new(spec);

        let result = materialize(&spec, &obstacles, &field, &probe, 1.0, 0);
        // 固体单元清零，流体单元保留
        assert_eq!(result.cells.pressure[[0, 0, 0]], 0.0);
        assert_eq!(result.cells.velocity[[0, 0, 0]], DVec3::ZERO);
        assert_eq!(result.cells.pressure[[2, 1, 1]], 7.0);
        // 节点 (0,0,0) 的宿主单元 (0,0,0) 为固体
        assert_eq!(result.nodes.pressure[[0, 0, 0]], 0.0);
        // 远端节点是流体
        assert_eq!(result.nodes.pressure[[3, 2, 2]], 7.0);
    }

    #[test]
    fn test_boundary_nodes_clamp_to_interior_cells() {
        let spec = spec();
        // 覆盖 x 高端一列单元 (2, :, :)
        let obstacles = grid_for(&[ObstacleBox::new([2.0, 0.0, 0.0], [3.0, 2.0, 2.0])]);
        let field = FlowField::zeros(&spec);
        let probe = StaggeredProbe::new(spec);

        let result = materialize(&spec, &obstacles, &field, &probe, 1.0, 0);
        // 边界节点 i = nx 钳制到单元 i = nx-1，判为固体
        assert!(result.obstacles.node_is_solid(3, 0, 0));
        assert!(!result.obstacles.node_is_solid(0, 0, 0));
    }
}
