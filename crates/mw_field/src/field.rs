// crates/mw_field/src/field.rs

//! 交错流场状态
//!
//! 压力存于单元中心(带一层幽灵单元)，速度分量存于对应方向的单元面:
//!
//! - `p`: (nx+2) x (ny+2) x (nz+2)
//! - `u`: (nx+1) x (ny+2) x (nz+2)，u[f, pj, pk] 为带层单元 (f, pj, pk)
//!   与 (f+1, pj, pk) 之间的面
//! - `v`: (nx+2) x (ny+1) x (nz+2)
//! - `w`: (nx+2) x (ny+2) x (nz+1)
//!
//! 数组形状由构造函数保证一致，此后按 pub 字段直接读写。

use glam::DVec3;
use mw_foundation::prelude::*;
use ndarray::Array3;

use crate::grid::GridSpec;

/// 一个作业的完整流场状态
#[derive(Debug, Clone)]
pub struct FlowField {
    /// 压力场，带幽灵层
    pub p: Array3<f64>,
    /// x 方向速度分量，x 面上
    pub u: Array3<f64>,
    /// y 方向速度分量，y 面上
    pub v: Array3<f64>,
    /// z 方向速度分量，z 面上
    pub w: Array3<f64>,
}

impl FlowField {
    /// 按网格规格创建全零场
    pub fn zeros(spec: &GridSpec) -> Self {
        Self {
            p: Array3::zeros(spec.padded_dims()),
            u: Array3::zeros(spec.u_dims()),
            v: Array3::zeros(spec.v_dims()),
            w: Array3::zeros(spec.w_dims()),
        }
    }

    /// 由现成数组组装，校验形状与网格一致
    pub fn from_parts(
        spec: &GridSpec,
        p: Array3<f64>,
        u: Array3<f64>,
        v: Array3<f64>,
        w: Array3<f64>,
    ) -> MwResult<Self> {
        let expect = [
            ("p", p.dim(), spec.padded_dims()),
            ("u", u.dim(), spec.u_dims()),
            ("v", v.dim(), spec.v_dims()),
            ("w", w.dim(), spec.w_dims()),
        ];
        for (name, actual, wanted) in expect {
            if actual != wanted {
                return Err(MwError::invalid_input(format!(
                    "{name} 形状 {actual:?} 与网格要求 {wanted:?} 不符"
                )));
            }
        }
        Ok(Self { p, u, v, w })
    }

    /// 逐元素累加另一个场
    pub fn accumulate(&mut self, other: &FlowField) {
        self.p += &other.p;
        self.u += &other.u;
        self.v += &other.v;
        self.w += &other.w;
    }

    /// 逐元素缩放
    pub fn scale(&mut self, factor: f64) {
        self.p *= factor;
        self.u *= factor;
        self.v *= factor;
        self.w *= factor;
    }

    /// 从另一个同形状场复制内容，不重新分配
    pub fn copy_from(&mut self, other: &FlowField) {
        self.p.assign(&other.p);
        self.u.assign(&other.u);
        self.v.assign(&other.v);
        self.w.assign(&other.w);
    }

    /// 内部单元 (i,j,k) 的压力
    pub fn cell_pressure(&self, i: usize, j: usize, k: usize) -> f64 {
        self.p[[i + 1, j + 1, k + 1]]
    }

    /// 内部单元 (i,j,k) 的中心速度，由六个面分量平均而来
    pub fn cell_velocity(&self, i: usize, j: usize, k: usize) -> DVec3 {
        let ux = 0.5 * (self.u[[i, j + 1, k + 1]] + self.u[[i + 1, j + 1, k + 1]]);
        let vy = 0.5 * (self.v[[i + 1, j, k + 1]] + self.v[[i + 1, j + 1, k + 1]]);
        let wz = 0.5 * (self.w[[i + 1, j + 1, k]] + self.w[[i + 1, j + 1, k + 1]]);
        DVec3::new(ux, vy, wz)
    }

    /// 四个数组的元素总数
    pub fn total_elements(&self) -> usize {
        self.p.len() + self.u.len() + self.v.len() + self.w.len()
    }

    /// 是否全部元素有限
    pub fn all_finite(&self) -> bool {
        self.p.iter().all(|x| x.is_finite())
            && self.u.iter().all(|x| x.is_finite())
            && self.v.iter().all(|x| x.is_finite())
            && self.w.iter().all(|x| x.is_finite())
    }
}
