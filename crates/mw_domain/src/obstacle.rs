// crates/mw_domain/src/obstacle.rs

//! 障碍物几何与分类格网
//!
//! 障碍物以轴对齐包围盒描述。分类格网与标量场同形
//! ((nx+2) x (ny+2) x (nz+2))，内部单元按中心点是否落入
//! 任一盒子判定，幽灵层恒为流体。
//!
//! 节点与单元采用同一套屏蔽规则: 节点 (i,j,k) 的判定取
//! 收拢后的地板单元 (min(i,nx-1), min(j,ny-1), min(k,nz-1))，
//! 边界末片节点与内部节点走同一条路径。

use glam::DVec3;
use mw_foundation::validation::{ValidationError, ValidationReport};
use mw_field::grid::GridSpec;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// 轴对齐障碍物包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleBox {
    /// 各轴下界 [m]
    pub min: [f64; 3],
    /// 各轴上界 [m]
    pub max: [f64; 3],
}

impl ObstacleBox {
    /// 构造
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// 将违规项写入验证报告，`index` 为盒子在列表中的序号
    pub fn validate_into(&self, index: usize, report: &mut ValidationReport) {
        for (axis_idx, axis) in ['x', 'y', 'z'].into_iter().enumerate() {
            let (lo, hi) = (self.min[axis_idx], self.max[axis_idx]);
            if !(lo.is_finite() && hi.is_finite()) {
                report.add_error(ValidationError::NotFinite {
                    field: "obstacle",
                    value: if lo.is_finite() { hi } else { lo },
                });
            } else if lo >= hi {
                report.add_error(ValidationError::EmptyBox {
                    index,
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
    }

    /// 点是否位于盒内(半开区间 [min, max))
    pub fn contains(&self, p: DVec3) -> bool {
        p.x >= self.min[0]
            && p.x < self.max[0]
            && p.y >= self.min[1]
            && p.y < self.max[1]
            && p.z >= self.min[2]
            && p.z < self.max[2]
    }
}

/// 障碍物分类格网
///
/// 作业创建时构建一次，此后只读，可在作业与其结果间共享。
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    nx: usize,
    ny: usize,
    nz: usize,
    cells: Array3<bool>,
    solid_count: usize,
}

impl ObstacleGrid {
    /// 按单元中心点对盒子列表分类
    pub fn build(spec: &GridSpec, boxes: &[ObstacleBox]) -> Self {
        let mut cells = Array3::from_elem(spec.padded_dims(), false);
        let mut solid_count = 0;
        for i in 0..spec.nx {
            for j in 0..spec.ny {
                for k in 0..spec.nz {
                    let center = spec.cell_center(i, j, k);
                    if boxes.iter().any(|b| b.contains(center)) {
                        cells[[i + 1, j + 1, k + 1]] = true;
                        solid_count += 1;
                    }
                }
            }
        }
        Self {
            nx: spec.nx,
            ny: spec.ny,
            nz: spec.nz,
            cells,
            solid_count,
        }
    }

    /// 带幽灵层格点维度
    pub fn padded_dims(&self) -> (usize, usize, usize) {
        self.cells.dim()
    }

    /// 带幽灵层下标判定
    pub fn is_solid_padded(&self, pi: usize, pj: usize, pk: usize) -> bool {
        self.cells[[pi, pj, pk]]
    }

    /// 内部单元 (i,j,k) 是否为固体
    pub fn cell_is_solid(&self, i: usize, j: usize, k: usize) -> bool {
        self.cells[[i + 1, j + 1, k + 1]]
    }

    /// 节点 (i,j,k) 是否按屏蔽规则视为固体
    ///
    /// 节点下标范围 [0, n]，收拢到地板单元后套用单元判定。
    pub fn node_is_solid(&self, i: usize, j: usize, k: usize) -> bool {
        let ci = i.min(self.nx - 1);
        let cj = j.min(self.ny - 1);
        let ck = k.min(self.nz - 1);
        self.cell_is_solid(ci, cj, ck)
    }

    /// 固体单元数
    pub fn solid_count(&self) -> usize {
        self.solid_count
    }

    /// 内部单元总数
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}
