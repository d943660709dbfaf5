// crates/mw_workflow/src/config.rs

//! 批次配置模块
//!
//! 两级配置: 批次内所有作业共享一份模板 (计算域、时间范围、求解参数)，
//! 逐作业只有障碍物分组不同。模板在作业创建时展开成每作业一份的
//! [`JobConfig`]，之后对模板的修改不影响已创建的作业。

use std::path::Path;

use mw_domain::{DomainConfig, ObstacleBox};
use mw_field::SolverParams;
use mw_foundation::prelude::*;
use serde::{Deserialize, Serialize};

/// 模拟时间范围
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 时间步长 [s]
    pub dt: f64,
    /// 模拟时域 [s]
    pub t_end: f64,
}

impl TimeConfig {
    /// 创建时间配置
    pub fn new(dt: f64, t_end: f64) -> Self {
        Self { dt, t_end }
    }

    /// 预计步数
    ///
    /// `dt > t_end` 属于退化情形: 作业不执行任何步就完成，返回 0。
    pub fn step_hint(&self) -> u64 {
        if self.dt > self.t_end {
            0
        } else {
            (self.t_end / self.dt).ceil() as u64
        }
    }

    /// 校验并把错误追加到报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        for (field, v) in [("time.dt", self.dt), ("time.t_end", self.t_end)] {
            if !v.is_finite() {
                report.add_error(ValidationError::NotFinite { field, value: v });
            } else if v <= 0.0 {
                report.add_error(ValidationError::NonPositive { field, value: v });
            }
        }
    }

    /// 单独校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("时间配置")
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            t_end: 10.0,
        }
    }
}

fn default_mean_window() -> usize {
    10
}

fn default_residuals() -> bool {
    true
}

/// 批次作业模板
///
/// 描述批次内每个作业除障碍物分组之外的全部参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    /// 计算域配置
    pub domain: DomainConfig,
    /// 时间范围
    pub time: TimeConfig,
    /// 尾部平均窗口长度 (快照条数, 0 = 关闭平均)
    #[serde(default = "default_mean_window")]
    pub mean_window: usize,
    /// 是否记录逐步残差
    #[serde(default = "default_residuals")]
    pub residuals: bool,
    /// 求解参数 (原样透传给引擎)
    #[serde(default)]
    pub solver: SolverParams,
}

impl JobTemplate {
    /// 校验并把错误追加到报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        self.domain.validate_into(report);
        self.time.validate_into(report);
        self.solver.validate_into(report);
    }

    /// 单独校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("作业模板")
    }
}

/// 单作业配置
///
/// 模板展开后的冻结副本，外加本作业的障碍物分组。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// 计算域配置
    pub domain: DomainConfig,
    /// 时间范围
    pub time: TimeConfig,
    /// 尾部平均窗口长度 (快照条数, 0 = 关闭平均)
    pub mean_window: usize,
    /// 是否记录逐步残差
    pub residuals: bool,
    /// 求解参数
    pub solver: SolverParams,
    /// 本作业的障碍物分组
    pub obstacles: Vec<ObstacleBox>,
}

impl JobConfig {
    /// 由模板与障碍物分组展开
    pub fn from_template(template: &JobTemplate, obstacles: Vec<ObstacleBox>) -> Self {
        Self {
            domain: template.domain.clone(),
            time: template.time,
            mean_window: template.mean_window,
            residuals: template.residuals,
            solver: template.solver,
            obstacles,
        }
    }

    /// 校验并把错误追加到报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        self.domain.validate_into(report);
        self.time.validate_into(report);
        self.solver.validate_into(report);
        for (idx, b) in self.obstacles.iter().enumerate() {
            b.validate_into(idx, report);
        }
    }

    /// 单独校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("作业配置")
    }
}

/// 批次配置文件
///
/// 一份模板 + 若干障碍物分组，每个分组生成一个作业。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 共享模板
    pub template: JobTemplate,
    /// 障碍物分组
    pub groups: Vec<Vec<ObstacleBox>>,
}

impl BatchConfig {
    /// 将生成的作业数
    pub fn job_count(&self) -> usize {
        self.groups.len()
    }

    /// 校验并把错误追加到报告
    pub fn validate_into(&self, report: &mut ValidationReport) {
        self.template.validate_into(report);
        if self.groups.is_empty() {
            report.add_error(ValidationError::Missing {
                field: "groups",
                reason: "至少需要一个障碍物分组",
            });
        }
        for group in &self.groups {
            for (idx, b) in group.iter().enumerate() {
                b.validate_into(idx, report);
            }
        }
    }

    /// 单独校验
    pub fn validate(&self) -> MwResult<()> {
        let mut report = ValidationReport::new();
        self.validate_into(&mut report);
        report.into_result("批次配置")
    }

    /// 从 JSON 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> MwResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MwError::io(format!("读取 {} 失败: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| MwError::config(format!("解析 {} 失败: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存为 JSON 文件
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> MwResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| MwError::config(format!("序列化批次配置失败: {e}")))?;
        std::fs::write(path, text)
            .map_err(|e| MwError::io(format!("写入 {} 失败: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mw_domain::TerrainCategory;

    fn template() -> JobTemplate {
        JobTemplate {
            domain: DomainConfig {
                extent: [4.0, 4.0, 4.0],
                divisions: [2, 2, 2],
                wind_speed: 10.0,
                terrain: TerrainCategory::OpenCountry,
                roughness: None,
            },
            time: TimeConfig::new(1.0, 5.0),
            mean_window: 2,
            residuals: true,
            solver: SolverParams::default(),
        }
    }

    #[test]
    fn test_time_config_validation() {
        assert!(TimeConfig::new(0.1, 10.0).validate().is_ok());
        assert!(TimeConfig::new(-0.1, 10.0).validate().is_err());
        assert!(TimeConfig::new(0.1, f64::NAN).validate().is_err());
        // dt > t_end 是合法的退化情形
        let degenerate = TimeConfig::new(10.0, 5.0);
        assert!(degenerate.validate().is_ok());
        assert_eq!(degenerate.step_hint(), 0);
    }

    #[test]
    fn test_step_hint() {
        assert_eq!(TimeConfig::new(1.0, 5.0).step_hint(), 5);
        assert_eq!(TimeConfig::new(3.0, 5.0).step_hint(), 2);
        assert_eq!(TimeConfig::new(5.0, 5.0).step_hint(), 1);
    }

    #[test]
    fn test_template_defaults_from_json() {
        let json = r#"{
            "domain": { "extent": [4.0, 4.0, 4.0], "divisions": [2, 2, 2], "wind_speed": 10.0 },
            "time": { "dt": 1.0, "t_end": 5.0 }
        }"#;
        let template: JobTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.mean_window, 10);
        assert!(template.residuals);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_job_config_from_template() {
        let boxes = vec![ObstacleBox::new([0.0; 3], [2.0; 3])];
        let config = JobConfig::from_template(&template(), boxes);
        assert_eq!(config.mean_window, 2);
        assert_eq!(config.obstacles.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_config_rejects_empty_groups() {
        let config = BatchConfig {
            template: template(),
            groups: vec![],
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("groups"));
    }

    #[test]
    fn test_batch_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");

        let config = BatchConfig {
            template: template(),
            groups: vec![vec![], vec![ObstacleBox::new([0.0; 3], [1.0; 3])]],
        };
        config.save_to_file(&path).unwrap();

        let loaded = BatchConfig::from_file(&path).unwrap();
        assert_eq!(loaded.job_count(), 2);
        assert_eq!(loaded.groups[1].len(), 1);
        assert_eq!(loaded.template.time.dt, 1.0);
    }

    #[test]
    fn test_batch_config_collects_all_errors() {
        let mut config = BatchConfig {
            template: template(),
            groups: vec![vec![ObstacleBox::new([2.0; 3], [1.0; 3])]],
        };
        config.template.time.dt = -1.0;
        let err = config.validate().unwrap_err().to_string();
        // 时间与障碍物的错误要同时报告
        assert!(err.contains("time.dt"));
        assert!(err.contains("障碍物 #0"));
    }
}
