use super::{PruneReport, Storage};
use crate::error::{Result, SyncError};
use crate::models::{FileRecord, RepositoryRoot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use walkdir::WalkDir;

pub struct LocalStorage {
    root: RepositoryRoot,
    name: String,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let root = RepositoryRoot::new(path);
        let name = format!("local:{}", root.path().display());
        Self { root, name }
    }

    /// 规范化路径分隔符（统一使用 /）
    ///
    /// 只有 Windows 上 `\` 才是分隔符，其他平台上它是文件名的一部分。
    fn normalize_path(path: &str) -> String {
        if cfg!(windows) {
            path.replace('\\', "/")
        } else {
            path.to_string()
        }
    }

    /// 遍历目录树，任何遍历错误都会中止并返回
    ///
    /// `require_root` 为 false 时根目录不存在返回空列表，否则返回 `RootMissing`。
    fn walk(base: &Path, require_root: bool) -> Result<Vec<FileRecord>> {
        if !base.is_dir() {
            if require_root {
                return Err(SyncError::RootMissing(base.to_path_buf()));
            }
            return Ok(Vec::new());
        }

        let listing_error = |source: walkdir::Error| SyncError::Listing {
            root: base.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in WalkDir::new(base).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(listing_error)?;

            // 跳过目录和符号链接
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = entry.metadata().map_err(listing_error)?;
            let full_path = entry.path().to_path_buf();
            let Ok(native_relative_path) = full_path.strip_prefix(base) else {
                continue;
            };
            let native_relative_path = native_relative_path.to_path_buf();
            let relative_path = Self::normalize_path(&native_relative_path.to_string_lossy());
            let directory_path = full_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.to_path_buf());

            files.push(FileRecord {
                relative_path,
                native_relative_path,
                directory_path,
                modified_at: DateTime::<Utc>::from(metadata.modified()?),
                size: metadata.len(),
                full_path,
            });
        }

        Ok(files)
    }

    fn list_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut subdirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                subdirs.push(entry.path());
            }
        }
        Ok(subdirs)
    }

    /// 递归删除空目录，子目录先于父目录处理
    ///
    /// 出错的目录记入 report 后继续处理其余目录。返回 false 表示 dir 本身无法读取。
    fn prune_dir(dir: &Path, report: &mut PruneReport) -> bool {
        let subdirs = match Self::list_subdirs(dir) {
            Ok(subdirs) => subdirs,
            Err(e) => {
                report.failures.push((dir.to_path_buf(), e.into()));
                return false;
            }
        };

        for subdir in subdirs {
            if !Self::prune_dir(&subdir, report) {
                continue;
            }

            let is_empty = match std::fs::read_dir(&subdir) {
                Ok(mut entries) => entries.next().is_none(),
                Err(e) => {
                    report.failures.push((subdir, e.into()));
                    continue;
                }
            };
            if !is_empty {
                continue;
            }

            match std::fs::remove_dir(&subdir) {
                Ok(()) => {
                    tracing::debug!("删除空目录: {}", subdir.display());
                    report.removed += 1;
                }
                Err(e) => report.failures.push((subdir, e.into())),
            }
        }

        true
    }

    /// 设置目标文件的修改时间，失败只记录警告
    ///
    /// 内容已经写入，修改时间设置失败不算复制失败。
    fn preserve_mtime(target: &Path, modified_at: DateTime<Utc>) -> bool {
        let mtime = FileTime::from_system_time(SystemTime::from(modified_at));
        match filetime::set_file_mtime(target, mtime) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("无法设置修改时间 {}: {}", target.display(), e);
                false
            }
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let base = self.root.path().to_path_buf();
        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || Self::walk(&base, false)).await?
    }

    async fn list_existing_files(&self) -> Result<Vec<FileRecord>> {
        let base = self.root.path().to_path_buf();
        tokio::task::spawn_blocking(move || Self::walk(&base, true)).await?
    }

    async fn copy_in(&self, file: &FileRecord) -> Result<()> {
        // 用原始相对路径拼目标路径，relative_path 只是比较用的键
        let target = self.root.path().join(&file.native_relative_path);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::copy(&file.full_path, &target).await?;

        // 保留源文件的修改时间，下次比较时两边时间相同即不再复制
        Self::preserve_mtime(&target, file.modified_at);

        Ok(())
    }

    async fn delete(&self, file: &FileRecord) -> Result<()> {
        match fs::remove_file(&file.full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn prune_empty_dirs(&self) -> Result<PruneReport> {
        let base = self.root.path().to_path_buf();
        if !base.is_dir() {
            return Ok(PruneReport::default());
        }
        let report = tokio::task::spawn_blocking(move || {
            let mut report = PruneReport::default();
            Self::prune_dir(&base, &mut report);
            report
        })
        .await?;
        Ok(report)
    }

    async fn available_space(&self) -> Option<u64> {
        match fs2::available_space(self.root.path()) {
            Ok(space) => Some(space),
            Err(e) => {
                tracing::warn!("无法获取可用空间 {}: {}", self.name, e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs as stdfs;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            stdfs::create_dir_all(parent).unwrap();
        }
        stdfs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_list_files_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("b.txt"), "bb");
        write(&dir.path().join("a/nested/c.txt"), "ccc");
        write(&dir.path().join("a/a.txt"), "a");
        stdfs::create_dir_all(dir.path().join("empty")).unwrap();

        let storage = LocalStorage::new(dir.path());
        let files = storage.list_files().await.unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a/a.txt", "a/nested/c.txt", "b.txt"]);

        let nested = &files[1];
        assert_eq!(nested.size, 3);
        assert_eq!(nested.full_path, dir.path().join("a/nested/c.txt"));
        assert_eq!(nested.directory_path, dir.path().join("a/nested"));
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("missing"));
        assert!(storage.list_files().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_unreadable_dir_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        write(&locked.join("secret.txt"), "x");
        stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o000)).unwrap();

        // root 用户不受权限限制，此时无法构造遍历错误
        if stdfs::read_dir(&locked).is_ok() {
            stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let storage = LocalStorage::new(dir.path());
        let result = storage.list_files().await;
        stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(SyncError::Listing { .. })));
    }

    #[tokio::test]
    async fn test_copy_in_creates_dirs_and_keeps_mtime() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("deep/dir/file.txt"), "hello");
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(src.path().join("deep/dir/file.txt"), mtime).unwrap();

        let source = LocalStorage::new(src.path());
        let dest = LocalStorage::new(dst.path());
        let file = source.list_files().await.unwrap().remove(0);

        dest.copy_in(&file).await.unwrap();

        let copied = dst.path().join("deep/dir/file.txt");
        assert_eq!(stdfs::read_to_string(&copied).unwrap(), "hello");
        let meta = stdfs::metadata(&copied).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
    }

    #[tokio::test]
    async fn test_copy_in_overwrites() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("x.txt"), "new");
        write(&dst.path().join("x.txt"), "old content");

        let source = LocalStorage::new(src.path());
        let dest = LocalStorage::new(dst.path());
        let file = source.list_files().await.unwrap().remove(0);
        dest.copy_in(&file).await.unwrap();

        assert_eq!(stdfs::read_to_string(dst.path().join("x.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_prune_keeps_root_and_non_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        stdfs::create_dir_all(dir.path().join("d")).unwrap();
        write(&dir.path().join("keep/file.txt"), "x");

        let storage = LocalStorage::new(dir.path());
        let report = storage.prune_empty_dirs().await.unwrap();

        assert_eq!(report.removed, 4);
        assert!(report.failures.is_empty());
        assert!(dir.path().exists());
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("d").exists());
        assert!(dir.path().join("keep/file.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prune_continues_past_unreadable_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("a_locked");
        write(&locked.join("inner/file.txt"), "x");
        stdfs::create_dir_all(dir.path().join("b_empty/c")).unwrap();
        stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o000)).unwrap();

        if stdfs::read_dir(&locked).is_ok() {
            stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let storage = LocalStorage::new(dir.path());
        let report = storage.prune_empty_dirs().await.unwrap();
        stdfs::set_permissions(&locked, stdfs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, locked);
        assert_eq!(report.removed, 2);
        assert!(!dir.path().join("b_empty").exists());
        assert!(locked.join("inner/file.txt").exists());
    }

    #[tokio::test]
    async fn test_list_existing_files_requires_root() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a.txt"), "a");

        let present = LocalStorage::new(dir.path());
        assert_eq!(present.list_existing_files().await.unwrap().len(), 1);

        let missing = LocalStorage::new(dir.path().join("missing"));
        assert!(matches!(
            missing.list_existing_files().await,
            Err(SyncError::RootMissing(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_in_keeps_backslash_in_file_name() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("a\\b.txt"), "slash");

        let source = LocalStorage::new(src.path());
        let dest = LocalStorage::new(dst.path());
        let file = source.list_files().await.unwrap().remove(0);
        assert_eq!(file.relative_path, "a\\b.txt");

        dest.copy_in(&file).await.unwrap();

        assert_eq!(
            stdfs::read_to_string(dst.path().join("a\\b.txt")).unwrap(),
            "slash"
        );
        assert!(!dst.path().join("a").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_copy_in_keeps_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"f\xff.txt");
        write(&src.path().join(name), "bytes");

        let source = LocalStorage::new(src.path());
        let dest = LocalStorage::new(dst.path());
        let file = source.list_files().await.unwrap().remove(0);
        assert_eq!(file.relative_path, "f\u{fffd}.txt");

        dest.copy_in(&file).await.unwrap();

        let names: Vec<_> = stdfs::read_dir(dst.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![name.to_os_string()]);
    }

    #[test]
    fn test_mtime_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("x.txt");
        write(&existing, "x");
        let when = Utc.timestamp_opt(1_500_000_000, 0).unwrap();

        assert!(!LocalStorage::preserve_mtime(&dir.path().join("missing.txt"), when));
        assert!(LocalStorage::preserve_mtime(&existing, when));
        let meta = stdfs::metadata(&existing).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta),
            FileTime::from_unix_time(1_500_000_000, 0)
        );
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("gone.txt"), "x");
        let storage = LocalStorage::new(dir.path());
        let file = storage.list_files().await.unwrap().remove(0);

        storage.delete(&file).await.unwrap();
        assert!(!file.full_path.exists());
        storage.delete(&file).await.unwrap();
    }

    #[tokio::test]
    async fn test_available_space_resolves_for_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.available_space().await.is_some());
    }
}
