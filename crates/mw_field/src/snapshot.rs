// crates/mw_field/src/snapshot.rs

//! 场快照与尾部平均窗口
//!
//! 作业在最后 m 步内逐步捕获快照，收集于有界环形缓冲。
//! 循环结束后对缓冲内全部快照做逐元素算术平均，
//! 用时间平均场代替带噪的瞬时场作为稳态结果。
//!
//! 缓冲容量固定为 m，满时先逐出最旧的一帧。正常参数组合下
//! 窗口条件保证不会溢出，逐出策略只为稳健性而定义。

use std::collections::VecDeque;

use crate::field::FlowField;

/// 单帧场快照
///
/// 创建后不可变，归捕获它的作业独占所有，不跨作业共享。
#[derive(Debug, Clone)]
pub struct FieldSnapshot {
    time: f64,
    field: FlowField,
}

impl FieldSnapshot {
    /// 在给定模拟时刻捕获一帧
    pub fn capture(time: f64, field: FlowField) -> Self {
        Self { time, field }
    }

    /// 捕获时刻
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 场数据
    pub fn field(&self) -> &FlowField {
        &self.field
    }
}

/// 快照环形缓冲
#[derive(Debug, Default)]
pub struct SnapshotRing {
    capacity: usize,
    slots: VecDeque<FieldSnapshot>,
}

impl SnapshotRing {
    /// 创建容量为 m 的缓冲; m = 0 表示禁用平均，push 直接丢弃
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    /// 压入一帧，满时逐出最旧帧
    pub fn push(&mut self, snapshot: FieldSnapshot) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(snapshot);
    }

    /// 当前帧数
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 配置容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按捕获顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &FieldSnapshot> {
        self.slots.iter()
    }

    /// 各帧的捕获时刻
    pub fn times(&self) -> Vec<f64> {
        self.slots.iter().map(|s| s.time).collect()
    }

    /// 全部快照的逐元素算术平均；空缓冲返回 None
    pub fn mean(&self) -> Option<FlowField> {
        let mut iter = self.slots.iter();
        let first = iter.next()?;
        let mut acc = first.field.clone();
        for snap in iter {
            acc.accumulate(&snap.field);
        }
        acc.scale(1.0 / self.slots.len() as f64);
        Some(acc)
    }

    /// 清空缓冲，保留容量
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
