//! 应用配置模块

use crate::error::{Result, SyncError};
use crate::logging::LogConfig;
use crate::models::SyncMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// 同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// 源仓库路径
    pub master_repository: PathBuf,
    /// 目标仓库路径
    pub backup_repository: PathBuf,
    /// 同步方式代码：1 = single, 2 = mirror
    #[serde(default = "default_method")]
    pub method: i64,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_method() -> i64 {
    SyncMethod::Single.code()
}

impl AppConfig {
    /// 从配置文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// 解析同步方式，未知代码返回 InvalidMethod
    pub fn sync_method(&self) -> Result<SyncMethod> {
        SyncMethod::try_from(self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_json(
            r#"{
                "masterRepository": "/data/master",
                "backupRepository": "/mnt/backup",
                "method": 2,
                "log": { "enabled": false, "level": "debug", "maxSizeMb": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.master_repository, PathBuf::from("/data/master"));
        assert_eq!(config.backup_repository, PathBuf::from("/mnt/backup"));
        assert_eq!(config.sync_method().unwrap(), SyncMethod::Mirror);
        assert!(!config.log.enabled);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.max_size_mb, 10);
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_json(r#"{ "masterRepository": "a", "backupRepository": "b" }"#)
                .unwrap();

        assert_eq!(config.sync_method().unwrap(), SyncMethod::Single);
        assert!(config.log.enabled);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_invalid_method_code() {
        let config = AppConfig::from_json(
            r#"{ "masterRepository": "a", "backupRepository": "b", "method": 7 }"#,
        )
        .unwrap();

        assert!(matches!(
            config.sync_method(),
            Err(SyncError::InvalidMethod(7))
        ));
    }

    #[test]
    fn test_missing_repository_is_config_error() {
        let result = AppConfig::from_json(r#"{ "masterRepository": "a" }"#);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"{ "masterRepository": "m", "backupRepository": "b", "method": 1 }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.master_repository, PathBuf::from("m"));

        assert!(matches!(
            AppConfig::load(&dir.path().join("missing.json")),
            Err(SyncError::Io(_))
        ));
    }
}
