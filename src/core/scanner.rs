use crate::error::Result;
use crate::models::FileRecord;
use crate::storage::Storage;
use std::collections::HashSet;
use tracing::{info, warn};

/// 文件扫描器
///
/// 每次调用都重新遍历仓库，不缓存结果。
#[derive(Debug, Default)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// 扫描存储并返回文件列表（保持存储给出的顺序）
    pub async fn scan_storage(&self, storage: &dyn Storage) -> Result<Vec<FileRecord>> {
        info!("开始扫描存储: {}", storage.name());
        let files = storage.list_files().await?;
        Self::summarize(&files);
        Ok(files)
    }

    /// 同 `scan_storage`，根目录不存在时返回错误而不是空列表
    pub async fn scan_existing(&self, storage: &dyn Storage) -> Result<Vec<FileRecord>> {
        info!("开始扫描存储: {}", storage.name());
        let files = storage.list_existing_files().await?;
        Self::summarize(&files);
        Ok(files)
    }

    fn summarize(files: &[FileRecord]) {
        let mut seen = HashSet::with_capacity(files.len());
        let mut total_bytes = 0u64;
        for file in files {
            total_bytes += file.size;
            if !seen.insert(file.relative_path.as_str()) {
                warn!(
                    "重复的相对路径: {} ({}), 比较时以最后一个为准",
                    file.relative_path,
                    file.full_path.display()
                );
            }
        }

        info!(
            "扫描完成: {} 个文件, {} 字节",
            files.len(),
            total_bytes
        );
    }
}
