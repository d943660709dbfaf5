// crates/mw_io/src/residuals.rs

//! 残差汇
//!
//! CSV 布局为分号分隔，首行列头:
//!
//! ```text
//! time;pmin;pmax;pavg;umin;umax;uavg;vmin;vmax;vavg;wmin;wmax;wavg
//! ```
//!
//! 每条记录一行。列结构与 [`ResidualRecord`] 一一对应，不随
//! 配置变化。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mw_field::ResidualRecord;
use mw_foundation::prelude::*;
use parking_lot::Mutex;
use tracing::debug;

/// 残差记录汇，只追加
pub trait ResidualSink: Send {
    /// 追加一条记录
    fn append(&mut self, record: &ResidualRecord) -> MwResult<()>;

    /// 冲刷缓冲
    fn flush(&mut self) -> MwResult<()> {
        Ok(())
    }
}

/// 按作业序号派生汇
pub trait SinkFactory: Send + Sync {
    /// 为序号为 `job_index` 的作业创建一个汇
    fn create(&self, job_index: usize) -> MwResult<Box<dyn ResidualSink>>;
}

/// CSV 列头
pub const CSV_HEADER: &str = "time;pmin;pmax;pavg;umin;umax;uavg;vmin;vmax;vavg;wmin;wmax;wavg";

fn csv_row(r: &ResidualRecord) -> String {
    format!(
        "{};{};{};{};{};{};{};{};{};{};{};{};{}",
        r.time,
        r.pressure.min,
        r.pressure.max,
        r.pressure.mean,
        r.u.min,
        r.u.max,
        r.u.mean,
        r.v.min,
        r.v.max,
        r.v.mean,
        r.w.min,
        r.w.max,
        r.w.mean,
    )
}

/// 写入单个 CSV 文件的汇
pub struct CsvResidualSink {
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvResidualSink {
    /// 创建文件并写入列头，已存在的文件被截断
    pub fn create(path: impl AsRef<Path>) -> MwResult<Self> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{CSV_HEADER}")?;
        Ok(Self { writer, rows: 0 })
    }

    /// 已写入的记录行数
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl ResidualSink for CsvResidualSink {
    fn append(&mut self, record: &ResidualRecord) -> MwResult<()> {
        writeln!(self.writer, "{}", csv_row(record))?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> MwResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// 收集到内存的汇，测试与嵌入场景使用
#[derive(Default)]
pub struct MemoryResidualSink {
    records: Arc<Mutex<Vec<ResidualRecord>>>,
}

impl MemoryResidualSink {
    /// 创建汇并返回共享的记录句柄
    pub fn shared() -> (Self, Arc<Mutex<Vec<ResidualRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl ResidualSink for MemoryResidualSink {
    fn append(&mut self, record: &ResidualRecord) -> MwResult<()> {
        self.records.lock().push(*record);
        Ok(())
    }
}

/// 丢弃一切的汇
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResidualSink;

impl ResidualSink for NullResidualSink {
    fn append(&mut self, _record: &ResidualRecord) -> MwResult<()> {
        Ok(())
    }
}

/// 空汇工厂，残差不落盘时的默认选择
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSinkFactory;

impl SinkFactory for NullSinkFactory {
    fn create(&self, _job_index: usize) -> MwResult<Box<dyn ResidualSink>> {
        Ok(Box::new(NullResidualSink))
    }
}

/// 目录式 CSV 汇工厂，每个作业一个文件
pub struct DirectorySinkFactory {
    dir: PathBuf,
    prefix: String,
}

impl DirectorySinkFactory {
    /// 指定输出目录，文件名形如 `residuals_job_000.csv`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "residuals_job_".to_string(),
        }
    }

    /// 覆盖文件名前缀
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// 序号对应的输出路径
    pub fn path_for(&self, job_index: usize) -> PathBuf {
        self.dir.join(format!("{}{job_index:03}.csv", self.prefix))
    }
}

impl SinkFactory for DirectorySinkFactory {
    fn create(&self, job_index: usize) -> MwResult<Box<dyn ResidualSink>> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(job_index);
        debug!("创建残差文件: {}", path.display());
        Ok(Box::new(CsvResidualSink::create(path)?))
    }
}

/// 内存汇工厂，按作业序号保留各自的记录
#[derive(Clone, Default)]
pub struct MemorySinkFactory {
    stores: Arc<Mutex<BTreeMap<usize, Arc<Mutex<Vec<ResidualRecord>>>>>>,
}

impl MemorySinkFactory {
    /// 创建
    pub fn new() -> Self {
        Self::default()
    }

    /// 某作业已收集的记录副本；该作业尚未建汇时返回空
    pub fn records_for(&self, job_index: usize) -> Vec<ResidualRecord> {
        self.stores
            .lock()
            .get(&job_index)
            .map(|s| s.lock().clone())
            .unwrap_or_default()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create(&self, job_index: usize) -> MwResult<Box<dyn ResidualSink>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        self.stores.lock().insert(job_index, records.clone());
        Ok(Box::new(MemoryResidualSink { records }))
    }
}
