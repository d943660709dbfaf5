// crates/mw_domain/src/terrain.rs

//! 地形类别与风廓线
//!
//! 四个命名地形类别携带 Davenport 分类的粗糙长度；
//! `Profile` 为保留类别，粗糙长度必须由配置显式给出，
//! 供上游耦合外部廓线(如 OpenFOAM 边界层)时使用。
//!
//! 风廓线取对数律:
//!
//! ```text
//! u(z) = u_ref * ln((z + z0) / z0) / ln((z_ref + z0) / z0)
//! ```
//!
//! 地面及以下取零。

use mw_foundation::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 地形类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainCategory {
    /// 海面
    Ocean,
    /// 平坦开阔乡村
    #[default]
    OpenCountry,
    /// 粗糙林地/市郊
    Suburban,
    /// 城镇/密集城区
    Urban,
    /// 外部廓线，粗糙长度由配置显式提供
    Profile,
}

impl TerrainCategory {
    /// 内建粗糙长度 [m]，`Profile` 返回 None
    pub fn roughness(&self) -> Option<f64> {
        match self {
            Self::Ocean => Some(0.0002),
            Self::OpenCountry => Some(0.03),
            Self::Suburban => Some(0.3),
            Self::Urban => Some(1.0),
            Self::Profile => None,
        }
    }
}

impl fmt::Display for TerrainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ocean => "ocean",
            Self::OpenCountry => "open_country",
            Self::Suburban => "suburban",
            Self::Urban => "urban",
            Self::Profile => "profile",
        };
        write!(f, "{name}")
    }
}

/// 参考高度 [m]，气象惯例 10 m
pub const REFERENCE_HEIGHT: f64 = 10.0;

/// 对数律风廓线
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindProfile {
    /// 参考高度处的风速 [m/s]
    pub reference_speed: f64,
    /// 参考高度 [m]
    pub reference_height: f64,
    /// 粗糙长度 [m]
    pub z0: f64,
}

impl WindProfile {
    /// 由地形类别构建
    ///
    /// `Profile` 类别要求 `roughness` 给出粗糙长度，命名类别使用内建值。
    pub fn from_category(
        reference_speed: f64,
        category: TerrainCategory,
        roughness: Option<f64>,
    ) -> MwResult<Self> {
        if !(reference_speed >= 0.0 && reference_speed.is_finite()) {
            return Err(MwError::config(format!(
                "风速必须为非负有限值, 实际 {reference_speed}"
            )));
        }
        let z0 = match category.roughness() {
            Some(builtin) => builtin,
            None => match roughness {
                Some(z0) if z0 > 0.0 && z0.is_finite() => z0,
                Some(z0) => {
                    return Err(MwError::config(format!("粗糙长度必须为正, 实际 {z0}")))
                }
                None => {
                    return Err(MwError::config(
                        "terrain = profile 需要显式给出 roughness",
                    ))
                }
            },
        };
        Ok(Self {
            reference_speed,
            reference_height: REFERENCE_HEIGHT,
            z0,
        })
    }

    /// 高度 z 处的水平风速 [m/s]
    pub fn speed_at(&self, z: f64) -> f64 {
        if z <= 0.0 || self.reference_speed == 0.0 {
            return 0.0;
        }
        let denom = ((self.reference_height + self.z0) / self.z0).ln();
        self.reference_speed * ((z + self.z0) / self.z0).ln() / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roughness() {
        assert_eq!(TerrainCategory::Ocean.roughness(), Some(0.0002));
        assert_eq!(TerrainCategory::Urban.roughness(), Some(1.0));
        assert_eq!(TerrainCategory::Profile.roughness(), None);
    }

    #[test]
    fn test_profile_requires_explicit_roughness() {
        assert!(WindProfile::from_category(5.0, TerrainCategory::Profile, None).is_err());
        assert!(WindProfile::from_category(5.0, TerrainCategory::Profile, Some(-0.1)).is_err());
        let p = WindProfile::from_category(5.0, TerrainCategory::Profile, Some(0.1)).unwrap();
        assert_eq!(p.z0, 0.1);
    }

    #[test]
    fn test_log_law_shape() {
        let p = WindProfile::from_category(10.0, TerrainCategory::OpenCountry, None).unwrap();
        // 地面为零，随高度单调增加，参考高度处取参考风速
        assert_eq!(p.speed_at(0.0), 0.0);
        assert_eq!(p.speed_at(-5.0), 0.0);
        assert!(p.speed_at(2.0) < p.speed_at(5.0));
        assert!((p.speed_at(REFERENCE_HEIGHT) - 10.0).abs() < 1e-12);
        assert!(p.speed_at(100.0) > 10.0);
    }

    #[test]
    fn test_zero_wind_everywhere_zero() {
        let p = WindProfile::from_category(0.0, TerrainCategory::Urban, None).unwrap();
        assert_eq!(p.speed_at(50.0), 0.0);
    }

    #[test]
    fn test_rejects_bad_speed() {
        assert!(WindProfile::from_category(-1.0, TerrainCategory::Ocean, None).is_err());
        assert!(WindProfile::from_category(f64::NAN, TerrainCategory::Ocean, None).is_err());
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&TerrainCategory::OpenCountry).unwrap();
        assert_eq!(json, "\"open_country\"");
        let parsed: TerrainCategory = serde_json::from_str("\"urban\"").unwrap();
        assert_eq!(parsed, TerrainCategory::Urban);
    }
}
