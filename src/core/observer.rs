//! 同步进度回调
//!
//! 每个回调都收到 `(file, index, total, success)`。index 从 1 开始，只统计成功的文件：
//! 某个文件失败时，after 回调收到的 index 已经减一。

use crate::models::FileRecord;
use serde::Serialize;
use tokio::sync::mpsc;

/// 进度观察者，所有方法默认为空实现
pub trait SyncObserver: Send + Sync {
    fn before_copy(&self, _file: &FileRecord, _index: usize, _total: usize, _success: bool) {}
    fn after_copy(&self, _file: &FileRecord, _index: usize, _total: usize, _success: bool) {}
    fn before_delete(&self, _file: &FileRecord, _index: usize, _total: usize, _success: bool) {}
    fn after_delete(&self, _file: &FileRecord, _index: usize, _total: usize, _success: bool) {}
}

/// 不输出任何进度
pub struct SilentObserver;

impl SyncObserver for SilentObserver {}

type Callback = Box<dyn Fn(&FileRecord, usize, usize, bool) + Send + Sync>;

/// 四个可选的回调槽，未注册的槽不触发
#[derive(Default)]
pub struct ProgressCallbacks {
    before_copy: Option<Callback>,
    after_copy: Option<Callback>,
    before_delete: Option<Callback>,
    after_delete: Option<Callback>,
}

impl ProgressCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_copy<F>(mut self, f: F) -> Self
    where
        F: Fn(&FileRecord, usize, usize, bool) + Send + Sync + 'static,
    {
        self.before_copy = Some(Box::new(f));
        self
    }

    pub fn on_after_copy<F>(mut self, f: F) -> Self
    where
        F: Fn(&FileRecord, usize, usize, bool) + Send + Sync + 'static,
    {
        self.after_copy = Some(Box::new(f));
        self
    }

    pub fn on_before_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&FileRecord, usize, usize, bool) + Send + Sync + 'static,
    {
        self.before_delete = Some(Box::new(f));
        self
    }

    pub fn on_after_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&FileRecord, usize, usize, bool) + Send + Sync + 'static,
    {
        self.after_delete = Some(Box::new(f));
        self
    }
}

impl SyncObserver for ProgressCallbacks {
    fn before_copy(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        if let Some(cb) = &self.before_copy {
            cb(file, index, total, success);
        }
    }

    fn after_copy(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        if let Some(cb) = &self.after_copy {
            cb(file, index, total, success);
        }
    }

    fn before_delete(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        if let Some(cb) = &self.before_delete {
            cb(file, index, total, success);
        }
    }

    fn after_delete(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        if let Some(cb) = &self.after_delete {
            cb(file, index, total, success);
        }
    }
}

/// 进度事件阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    BeforeCopy,
    AfterCopy,
    BeforeDelete,
    AfterDelete,
}

/// 进度事件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub phase: SyncPhase,
    pub file: FileRecord,
    pub index: usize,
    pub total: usize,
    pub success: bool,
}

/// 通过 channel 发送进度事件
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, phase: SyncPhase, file: &FileRecord, index: usize, total: usize, success: bool) {
        // 接收端已关闭时丢弃事件
        let _ = self.tx.send(SyncEvent {
            phase,
            file: file.clone(),
            index,
            total,
            success,
        });
    }
}

impl SyncObserver for ChannelObserver {
    fn before_copy(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        self.emit(SyncPhase::BeforeCopy, file, index, total, success);
    }

    fn after_copy(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        self.emit(SyncPhase::AfterCopy, file, index, total, success);
    }

    fn before_delete(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        self.emit(SyncPhase::BeforeDelete, file, index, total, success);
    }

    fn after_delete(&self, file: &FileRecord, index: usize, total: usize, success: bool) {
        self.emit(SyncPhase::AfterDelete, file, index, total, success);
    }
}
