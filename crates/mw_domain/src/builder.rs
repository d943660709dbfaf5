// crates/mw_domain/src/builder.rs

//! 域构建接缝
//!
//! 给定域尺寸、离散数、风速与地形参数以及障碍物列表，
//! 产出作业消费的障碍物分类格网和初始场。
//! 每次作业(重)创建时恰好调用一次。
//!
//! [`WindTunnelBuilder`] 是默认实现: 初始场取对数律入流
//! 充满整个 u 分量数组，固体邻接面置零。需要更精细初始化
//! 的场合由外部实现接管。

use std::sync::Arc;

use mw_foundation::prelude::*;
use mw_foundation::validation::{ValidationError, ValidationReport};
use mw_field::{FlowField, GridSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::obstacle::{ObstacleBox, ObstacleGrid};
use crate::terrain::{TerrainCategory, WindProfile};

/// 计算域配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// 域尺寸 [m]，各轴严格为正
    pub extent: [f64; 3],
    /// 各轴内部单元数，至少为 1
    pub divisions: [usize; 3],
    /// 参考风速 [m/s]
    pub wind_speed: f64,
    /// 地形类别
    #[serde(default)]
    pub terrain: TerrainCategory,
    /// 粗糙长度 [m]，仅 `terrain = profile` 时必需
    #[serde(default)]
    pub roughness: Option<f64>,
}

impl DomainConfig {
    /// 将违规项写入验证报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        let fields = ["extent.x", "extent.y", "extent.z"];
        for (idx, field) in fields.into_iter().enumerate() {
            let v = self.extent[idx];
            if !v.is_finite() {
                report.add_error(ValidationError::NotFinite { field, value: v });
            } else if v <= 0.0 {
                report.add_error(ValidationError::NonPositive { field, value: v });
            }
        }
        let counts = ["divisions.x", "divisions.y", "divisions.z"];
        for (idx, field) in counts.into_iter().enumerate() {
            if self.divisions[idx] == 0 {
                report.add_error(ValidationError::ZeroCount { field });
            }
        }
        if !self.wind_speed.is_finite() {
            report.add_error(ValidationError::NotFinite {
                field: "wind_speed",
                value: self.wind_speed,
            });
        } else if self.wind_speed < 0.0 {
            report.add_error(ValidationError::NonPositive {
                field: "wind_speed",
                value: self.wind_speed,
            });
        }
        match (self.terrain, self.roughness) {
            (TerrainCategory::Profile, None) => report.add_error(ValidationError::Missing {
                field: "roughness",
                reason: "terrain = profile 时必须显式给出",
            }),
            (_, Some(z0)) if !(z0 > 0.0 && z0.is_finite()) => {
                report.add_error(ValidationError::NonPositive {
                    field: "roughness",
                    value: z0,
                })
            }
            _ => {}
        }
    }

    /// 独立校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("域配置")
    }
}

/// 域构建产物，作业创建后只读
#[derive(Debug, Clone)]
pub struct DomainSetup {
    /// 网格规格
    pub spec: GridSpec,
    /// 障碍物分类格网
    pub obstacles: Arc<ObstacleGrid>,
    /// 初始场
    pub initial: FlowField,
    /// 入流风廓线
    pub profile: WindProfile,
}

/// 域构建接缝
pub trait DomainBuilder: Send + Sync {
    /// 构建器名称，用于日志
    fn name(&self) -> &str {
        "domain"
    }

    /// 构建一个作业的域
    fn build(&self, domain: &DomainConfig, obstacles: &[ObstacleBox]) -> MwResult<DomainSetup>;
}

/// 默认域构建器: 对数律入流风洞
#[derive(Debug, Clone, Copy, Default)]
pub struct WindTunnelBuilder;

impl DomainBuilder for WindTunnelBuilder {
    fn name(&self) -> &str {
        "wind_tunnel"
    }

    fn build(&self, domain: &DomainConfig, obstacles: &[ObstacleBox]) -> MwResult<DomainSetup> {
        let mut report = ValidationReport::new();
        domain.validate_into(&mut report);
        for (idx, b) in obstacles.iter().enumerate() {
            b.validate_into(idx, &mut report);
        }
        report.into_result("域配置")?;

        let spec = GridSpec::from_extent(domain.extent, domain.divisions)?;
        let profile =
            WindProfile::from_category(domain.wind_speed, domain.terrain, domain.roughness)?;
        let grid = Arc::new(ObstacleGrid::build(&spec, obstacles));

        let mut initial = FlowField::zeros(&spec);
        let (fu, pj_n, pk_n) = spec.u_dims();
        for fi in 0..fu {
            for pj in 0..pj_n {
                for pk in 0..pk_n {
                    // u 面位于带层单元 (fi,pj,pk) 与 (fi+1,pj,pk) 之间
                    if grid.is_solid_padded(fi, pj, pk) || grid.is_solid_padded(fi + 1, pj, pk) {
                        continue;
                    }
                    let z = (pk as f64 - 0.5) * spec.hz;
                    initial.u[[fi, pj, pk]] = profile.speed_at(z);
                }
            }
        }

        debug!(
            "域构建完成: {}x{}x{} 单元, {} 固体, 入流 {:.2} m/s @ {} m",
            spec.nx,
            spec.ny,
            spec.nz,
            grid.solid_count(),
            profile.reference_speed,
            profile.reference_height,
        );

        Ok(DomainSetup {
            spec,
            obstacles: grid,
            initial,
            profile,
        })
    }
}
