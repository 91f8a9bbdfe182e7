use crate::core::comparator::FileComparator;
use crate::core::observer::{SilentObserver, SyncObserver};
use crate::core::scanner::FileScanner;
use crate::core::space::SpaceGuard;
use crate::error::{Result, SyncError};
use crate::models::{FileRecord, SyncMethod, SyncOutcome};
use crate::storage::{LocalStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MASTER_MISSING: &str = "MasterRepository does not exist!";
pub const BACKUP_MISSING: &str = "BackUpRepository does not exist!";
pub const NOT_ENOUGH_SPACE: &str = "There is not enough free space on destination disk!";

/// 一次同步会话：源仓库、目标仓库和同步方式
///
/// 会话本身不保存运行状态，`files_to_copy` / `files_to_delete` 可以重复调用，
/// 每次都会重新扫描两个仓库。
pub struct SyncSession {
    source: Arc<dyn Storage>,
    dest: Arc<dyn Storage>,
    method: SyncMethod,
    observer: Arc<dyn SyncObserver>,
    scanner: FileScanner,
    comparator: FileComparator,
}

impl SyncSession {
    pub fn new(master: impl Into<PathBuf>, backup: impl Into<PathBuf>, method: SyncMethod) -> Self {
        Self::with_storage(
            Arc::new(LocalStorage::new(master)),
            Arc::new(LocalStorage::new(backup)),
            method,
        )
    }

    pub fn with_storage(
        source: Arc<dyn Storage>,
        dest: Arc<dyn Storage>,
        method: SyncMethod,
    ) -> Self {
        Self {
            source,
            dest,
            method,
            observer: Arc::new(SilentObserver),
            scanner: FileScanner::new(),
            comparator: FileComparator::new(),
        }
    }

    /// 注册进度回调
    pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn method(&self) -> SyncMethod {
        self.method
    }

    pub fn is_master_valid(&self) -> bool {
        self.source.exists()
    }

    pub fn is_backup_valid(&self) -> bool {
        self.dest.exists()
    }

    /// 扫描两个仓库；任一仓库不存在时返回 None
    async fn scan_both(&self) -> Result<Option<(Vec<FileRecord>, Vec<FileRecord>)>> {
        if !self.is_master_valid() || !self.is_backup_valid() {
            return Ok(None);
        }

        let source_files = self.scanner.scan_storage(self.source.as_ref()).await?;
        let dest_files = self.scanner.scan_storage(self.dest.as_ref()).await?;
        Ok(Some((source_files, dest_files)))
    }

    /// 需要复制到目标仓库的文件
    pub async fn files_to_copy(&self) -> Result<Vec<FileRecord>> {
        Ok(match self.scan_both().await? {
            Some((source, dest)) => self.comparator.files_to_copy(&source, &dest),
            None => Vec::new(),
        })
    }

    /// 需要从目标仓库删除的文件
    pub async fn files_to_delete(&self) -> Result<Vec<FileRecord>> {
        Ok(match self.scan_both().await? {
            Some((source, dest)) => self.comparator.files_to_delete(&source, &dest),
            None => Vec::new(),
        })
    }

    /// 运行同步
    ///
    /// 前置条件失败时返回失败的结果，不做任何文件操作；扫描失败时返回错误。
    pub async fn run(&self) -> Result<SyncOutcome> {
        info!(
            "开始同步: {} -> {} ({})",
            self.source.name(),
            self.dest.name(),
            self.method
        );

        if !self.is_master_valid() {
            warn!("源仓库不存在: {}", self.source.name());
            return Ok(SyncOutcome::failed(MASTER_MISSING));
        }
        if !self.is_backup_valid() {
            warn!("目标仓库不存在: {}", self.dest.name());
            return Ok(SyncOutcome::failed(BACKUP_MISSING));
        }

        // 校验之后仓库被移走时按前置条件失败处理，不能当作空仓库继续
        let source_files = match self.scanner.scan_existing(self.source.as_ref()).await {
            Ok(files) => files,
            Err(SyncError::RootMissing(root)) => {
                warn!("源仓库在扫描前消失: {}", root.display());
                return Ok(SyncOutcome::failed(MASTER_MISSING));
            }
            Err(e) => return Err(e),
        };
        let dest_files = match self.scanner.scan_existing(self.dest.as_ref()).await {
            Ok(files) => files,
            Err(SyncError::RootMissing(root)) => {
                warn!("目标仓库在扫描前消失: {}", root.display());
                return Ok(SyncOutcome::failed(BACKUP_MISSING));
            }
            Err(e) => return Err(e),
        };
        let to_copy = self.comparator.files_to_copy(&source_files, &dest_files);
        let to_delete = self.comparator.files_to_delete(&source_files, &dest_files);

        let total_bytes = FileComparator::total_size(&to_copy);
        if !SpaceGuard::new(self.dest.as_ref()).check(total_bytes).await {
            warn!("目标磁盘空间不足, 需要 {} 字节", total_bytes);
            return Ok(SyncOutcome::failed(NOT_ENOUGH_SPACE));
        }

        debug!(
            "比较完成: {} 个复制 ({} 字节), {} 个删除",
            to_copy.len(),
            total_bytes,
            to_delete.len()
        );

        let outcome = match self.method {
            SyncMethod::Single => self.single_sync(&to_copy).await,
            SyncMethod::Mirror => self.mirror_sync(&to_copy, &to_delete).await,
        };

        info!(
            "同步完成: 复制 {}, 删除 {}, 失败 {}",
            outcome.files_copied,
            outcome.files_deleted,
            outcome.errors.len()
        );

        Ok(outcome)
    }

    /// 只复制，不删除
    async fn single_sync(&self, files: &[FileRecord]) -> SyncOutcome {
        let total = files.len();
        let mut index = 0usize;
        let mut errors = Vec::new();

        for file in files {
            index += 1;
            self.observer.before_copy(file, index, total, true);

            debug!("复制: {} ({}字节)", file.relative_path, file.size);
            let copied = match self.dest.copy_in(file).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("复制失败: {} - {}", file.relative_path, e);
                    errors.push(format!(
                        "Error copying {}, reason: {}",
                        file.relative_path, e
                    ));
                    // 失败的文件不计入序号
                    index -= 1;
                    false
                }
            };

            self.observer.after_copy(file, index, total, copied);
        }

        let mut lines = errors.clone();
        lines.push(format!("{} Files copied!", index));

        SyncOutcome {
            success: errors.is_empty(),
            message: lines.join("\n"),
            files_copied: index,
            files_deleted: 0,
            errors,
        }
    }

    /// 复制 + 删除 + 清理空目录
    async fn mirror_sync(&self, to_copy: &[FileRecord], to_delete: &[FileRecord]) -> SyncOutcome {
        let copied = self.single_sync(to_copy).await;

        let total = to_delete.len();
        let mut index = 0usize;
        let mut errors = Vec::new();

        for file in to_delete {
            index += 1;
            self.observer.before_delete(file, index, total, true);

            debug!("删除: {}", file.relative_path);
            let deleted = match self.dest.delete(file).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("删除失败: {} - {}", file.relative_path, e);
                    errors.push(format!(
                        "Error deleting {}, reason: {}",
                        file.relative_path, e
                    ));
                    index -= 1;
                    false
                }
            };

            self.observer.after_delete(file, index, total, deleted);
        }

        // 必须在删除文件之后清理，刚被清空的目录也要删掉
        match self.dest.prune_empty_dirs().await {
            Ok(report) => {
                debug!("已清理 {} 个空目录", report.removed);
                for (dir, e) in report.failures {
                    warn!("清理空目录失败: {} - {}", dir.display(), e);
                    errors.push(format!("Error pruning {}, reason: {}", dir.display(), e));
                }
            }
            Err(e) => {
                warn!("清理空目录失败: {}", e);
                errors.push(format!(
                    "Error pruning {}, reason: {}",
                    self.dest.root().path().display(),
                    e
                ));
            }
        }

        let mut lines = vec![copied.message];
        lines.extend(errors.iter().cloned());
        lines.push(format!("{} Files deleted!", index));

        let mut all_errors = copied.errors;
        all_errors.extend(errors);

        SyncOutcome {
            success: all_errors.is_empty(),
            message: lines.join("\n"),
            files_copied: copied.files_copied,
            files_deleted: index,
            errors: all_errors,
        }
    }
}
