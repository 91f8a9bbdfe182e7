//! 同步数据模型

use crate::error::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 仓库中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// 绝对路径
    pub full_path: PathBuf,
    /// 相对仓库根目录的路径（统一使用 /），跨仓库比较的键
    pub relative_path: String,
    /// 相对仓库根目录的原始路径，复制时据此拼出目标路径
    pub native_relative_path: PathBuf,
    /// 所在目录的绝对路径
    pub directory_path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

/// 仓库根目录
///
/// 存在性每次都重新检查文件系统，不做缓存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRoot {
    path: PathBuf,
}

impl RepositoryRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // 相对路径按当前工作目录补全，保证 FileRecord.full_path 为绝对路径
        let path = if path.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
        } else {
            path
        };
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// 同步方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// 只复制新增或更新的文件
    Single,
    /// 复制 + 删除目标中多余的文件 + 清理空目录
    Mirror,
}

impl SyncMethod {
    /// 外部配置使用的整数代码
    pub fn code(self) -> i64 {
        match self {
            SyncMethod::Single => 1,
            SyncMethod::Mirror => 2,
        }
    }
}

impl TryFrom<i64> for SyncMethod {
    type Error = SyncError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SyncMethod::Single),
            2 => Ok(SyncMethod::Mirror),
            other => Err(SyncError::InvalidMethod(other)),
        }
    }
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMethod::Single => write!(f, "single"),
            SyncMethod::Mirror => write!(f, "mirror"),
        }
    }
}

/// 一次同步的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// 没有任何单文件操作失败时为 true
    pub success: bool,
    /// 错误行 + 统计行，按行分隔
    pub message: String,
    pub files_copied: usize,
    pub files_deleted: usize,
    pub errors: Vec<String>,
}

impl SyncOutcome {
    /// 前置条件失败，未进行任何文件操作
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            errors: vec![message.clone()],
            message,
            files_copied: 0,
            files_deleted: 0,
        }
    }
}
