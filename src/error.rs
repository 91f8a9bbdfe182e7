//! 错误类型

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 遍历目录树时出错，整个列表作废
    #[error("Failed to list {root}: {source}")]
    Listing {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// 通过校验之后仓库根目录消失
    #[error("Repository root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Invalid sync method code: {0}")]
    InvalidMethod(i64),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
