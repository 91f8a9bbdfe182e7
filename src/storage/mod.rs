pub mod local;

use crate::error::{Result, SyncError};
use crate::models::{FileRecord, RepositoryRoot};
use async_trait::async_trait;
use std::path::PathBuf;

pub use local::LocalStorage;

/// 仓库存储接口，一个实例对应一个仓库根目录
#[async_trait]
pub trait Storage: Send + Sync {
    /// 仓库根目录
    fn root(&self) -> &RepositoryRoot;

    /// 递归列出所有普通文件；根目录不存在时返回空列表
    async fn list_files(&self) -> Result<Vec<FileRecord>>;

    /// 同 `list_files`，但根目录不存在时返回 `SyncError::RootMissing`
    async fn list_existing_files(&self) -> Result<Vec<FileRecord>>;

    /// 把另一个仓库中的文件复制到本仓库的同一相对路径，覆盖已存在的文件
    async fn copy_in(&self, file: &FileRecord) -> Result<()>;

    /// 删除文件
    async fn delete(&self, file: &FileRecord) -> Result<()>;

    /// 自底向上删除空目录（不含根目录）
    ///
    /// 单个目录失败不会中止整个过程，失败的目录记录在返回结果中。
    async fn prune_empty_dirs(&self) -> Result<PruneReport>;

    /// 所在卷的可用空间，无法获取时返回 None
    async fn available_space(&self) -> Option<u64>;

    /// 检查仓库是否存在
    fn exists(&self) -> bool {
        self.root().exists()
    }

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 清理空目录的结果
#[derive(Debug, Default)]
pub struct PruneReport {
    /// 删除的目录数
    pub removed: usize,
    /// 无法读取或删除的目录
    pub failures: Vec<(PathBuf, SyncError)>,
}
