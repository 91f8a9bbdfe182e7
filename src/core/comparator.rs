use crate::models::FileRecord;
use std::collections::HashMap;

/// 文件比较器
///
/// 只按相对路径和修改时间比较，不比较内容。两个列表都是只读输入。
#[derive(Debug, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 按相对路径建立索引，重复路径以最后一个为准
    fn index(files: &[FileRecord]) -> HashMap<&str, &FileRecord> {
        files
            .iter()
            .map(|f| (f.relative_path.as_str(), f))
            .collect()
    }

    /// 需要复制的文件：目标中不存在，或源文件严格更新
    pub fn files_to_copy(&self, source: &[FileRecord], dest: &[FileRecord]) -> Vec<FileRecord> {
        let dest_index = Self::index(dest);

        source
            .iter()
            .filter(|src| match dest_index.get(src.relative_path.as_str()) {
                None => true,
                Some(dst) => src.modified_at > dst.modified_at,
            })
            .cloned()
            .collect()
    }

    /// 需要删除的文件：目标中有而源中没有
    pub fn files_to_delete(&self, source: &[FileRecord], dest: &[FileRecord]) -> Vec<FileRecord> {
        let source_index = Self::index(source);

        dest.iter()
            .filter(|dst| !source_index.contains_key(dst.relative_path.as_str()))
            .cloned()
            .collect()
    }

    /// 待复制文件的总字节数
    pub fn total_size(files: &[FileRecord]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
