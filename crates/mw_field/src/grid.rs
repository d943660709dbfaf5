// crates/mw_field/src/grid.rs

//! 网格几何
//!
//! 固定尺寸长方体计算域，内部均分为 Nx x Ny x Nz 个单元。
//! 标量场带一层幽灵单元，速度分量交错布置在单元面上。
//!
//! # 三套格点
//!
//! - 内部单元 (i,j,k), i in [0, nx): 中心位于 ((i+0.5)hx, ...)
//! - 带幽灵层的标量格点: (nx+2) x (ny+2) x (nz+2)，内部单元 (i,j,k)
//!   对应带层下标 (i+1, j+1, k+1)
//! - 节点 (i,j,k), i in [0, nx]: 位于 (i*hx, j*hy, k*hz)，比单元格
//!   在每个方向多一层"末片"

use glam::DVec3;
use mw_foundation::prelude::*;
use serde::{Deserialize, Serialize};

/// 网格规格
///
/// 原点固定为 (0,0,0)，域沿各轴正方向延伸。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// x 方向内部单元数
    pub nx: usize,
    /// y 方向内部单元数
    pub ny: usize,
    /// z 方向内部单元数
    pub nz: usize,
    /// x 方向网格间距 [m]
    pub hx: f64,
    /// y 方向网格间距 [m]
    pub hy: f64,
    /// z 方向网格间距 [m]
    pub hz: f64,
}

impl GridSpec {
    /// 由域尺寸和单元数构建
    pub fn from_extent(extent: [f64; 3], divisions: [usize; 3]) -> MwResult<Self> {
        let [ex, ey, ez] = extent;
        let [nx, ny, nz] = divisions;
        check_count("nx", nx)?;
        check_count("ny", ny)?;
        check_count("nz", nz)?;
        check_range("域尺寸 x", ex, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("域尺寸 y", ey, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("域尺寸 z", ez, f64::MIN_POSITIVE, f64::MAX)?;
        Ok(Self {
            nx,
            ny,
            nz,
            hx: ex / nx as f64,
            hy: ey / ny as f64,
            hz: ez / nz as f64,
        })
    }

    /// 域尺寸 [m]
    pub fn extent(&self) -> DVec3 {
        DVec3::new(
            self.nx as f64 * self.hx,
            self.ny as f64 * self.hy,
            self.nz as f64 * self.hz,
        )
    }

    /// 内部单元维度 (nx, ny, nz)
    pub fn cell_dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// 带幽灵层的标量格点维度 (nx+2, ny+2, nz+2)
    pub fn padded_dims(&self) -> (usize, usize, usize) {
        (self.nx + 2, self.ny + 2, self.nz + 2)
    }

    /// 节点格点维度 (nx+1, ny+1, nz+1)
    pub fn node_dims(&self) -> (usize, usize, usize) {
        (self.nx + 1, self.ny + 1, self.nz + 1)
    }

    /// u 分量数组维度 (nx+1, ny+2, nz+2)
    pub fn u_dims(&self) -> (usize, usize, usize) {
        (self.nx + 1, self.ny + 2, self.nz + 2)
    }

    /// v 分量数组维度 (nx+2, ny+1, nz+2)
    pub fn v_dims(&self) -> (usize, usize, usize) {
        (self.nx + 2, self.ny + 1, self.nz + 2)
    }

    /// w 分量数组维度 (nx+2, ny+2, nz+1)
    pub fn w_dims(&self) -> (usize, usize, usize) {
        (self.nx + 2, self.ny + 2, self.nz + 1)
    }

    /// 内部单元总数
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// 节点总数
    pub fn node_count(&self) -> usize {
        (self.nx + 1) * (self.ny + 1) * (self.nz + 1)
    }

    /// 内部单元 (i,j,k) 的中心坐标
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> DVec3 {
        DVec3::new(
            (i as f64 + 0.5) * self.hx,
            (j as f64 + 0.5) * self.hy,
            (k as f64 + 0.5) * self.hz,
        )
    }

    /// 节点 (i,j,k) 的坐标
    pub fn node_point(&self, i: usize, j: usize, k: usize) -> DVec3 {
        DVec3::new(i as f64 * self.hx, j as f64 * self.hy, k as f64 * self.hz)
    }

    /// 包含给定点的内部单元下标，越界时收拢到最近单元
    pub fn clamped_cell_of(&self, point: DVec3) -> (usize, usize, usize) {
        let clamp = |x: f64, h: f64, n: usize| -> usize {
            let idx = (x / h).floor();
            if idx < 0.0 {
                0
            } else {
                (idx as usize).min(n - 1)
            }
        };
        (
            clamp(point.x, self.hx, self.nx),
            clamp(point.y, self.hy, self.ny),
            clamp(point.z, self.hz, self.nz),
        )
    }

    /// 点是否落在域内
    pub fn contains(&self, point: DVec3) -> bool {
        let e = self.extent();
        (0.0..=e.x).contains(&point.x)
            && (0.0..=e.y).contains(&point.y)
            && (0.0..=e.z).contains(&point.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_442() -> GridSpec {
        GridSpec::from_extent([8.0, 4.0, 2.0], [4, 4, 2]).unwrap()
    }

    #[test]
    fn test_spacing_and_dims() {
        let g = spec_442();
        assert_eq!(g.hx, 2.0);
        assert_eq!(g.hy, 1.0);
        assert_eq!(g.hz, 1.0);
        assert_eq!(g.padded_dims(), (6, 6, 4));
        assert_eq!(g.node_dims(), (5, 5, 3));
        assert_eq!(g.u_dims(), (5, 6, 4));
        assert_eq!(g.v_dims(), (6, 5, 4));
        assert_eq!(g.w_dims(), (6, 6, 3));
        assert_eq!(g.cell_count(), 32);
    }

    #[test]
    fn test_rejects_bad_extent() {
        assert!(GridSpec::from_extent([0.0, 1.0, 1.0], [2, 2, 2]).is_err());
        assert!(GridSpec::from_extent([1.0, 1.0, 1.0], [0, 2, 2]).is_err());
        assert!(GridSpec::from_extent([f64::NAN, 1.0, 1.0], [2, 2, 2]).is_err());
    }

    #[test]
    fn test_cell_center_and_node() {
        let g = spec_442();
        assert_eq!(g.cell_center(0, 0, 0), DVec3::new(1.0, 0.5, 0.5));
        assert_eq!(g.node_point(0, 0, 0), DVec3::ZERO);
        assert_eq!(g.node_point(4, 4, 2), DVec3::new(8.0, 4.0, 2.0));
    }

    #[test]
    fn test_clamped_cell_lookup() {
        let g = spec_442();
        // 域内点
        assert_eq!(g.clamped_cell_of(DVec3::new(1.0, 0.5, 0.5)), (0, 0, 0));
        assert_eq!(g.clamped_cell_of(DVec3::new(7.9, 3.9, 1.9)), (3, 3, 1));
        // 末端节点恰在域边界，收拢到最后一个单元
        assert_eq!(g.clamped_cell_of(DVec3::new(8.0, 4.0, 2.0)), (3, 3, 1));
        // 域外点
        assert_eq!(g.clamped_cell_of(DVec3::new(-1.0, -1.0, -1.0)), (0, 0, 0));
        assert_eq!(g.clamped_cell_of(DVec3::new(100.0, 100.0, 100.0)), (3, 3, 1));
    }

    #[test]
    fn test_contains() {
        let g = spec_442();
        assert!(g.contains(DVec3::new(4.0, 2.0, 1.0)));
        assert!(g.contains(DVec3::ZERO));
        assert!(!g.contains(DVec3::new(8.1, 0.0, 0.0)));
    }
}
