//! 目标磁盘空间检查

use crate::storage::Storage;
use tracing::{debug, warn};

/// 预留空间 10MB
pub const RESERVE_MARGIN: u64 = 10 * 1024 * 1024;

/// free >= total - 10MB 时通过；total 不足 10MB 时总是通过
pub fn has_enough_space(free: u64, total: u64) -> bool {
    free >= total.saturating_sub(RESERVE_MARGIN)
}

/// 磁盘空间检查
///
/// 只在同步开始前检查一次，同步过程中其他程序占用的空间不会被发现。
pub struct SpaceGuard<'a> {
    dest: &'a dyn Storage,
}

impl<'a> SpaceGuard<'a> {
    pub fn new(dest: &'a dyn Storage) -> Self {
        Self { dest }
    }

    pub async fn check(&self, total_bytes: u64) -> bool {
        // 获取不到可用空间时按 0 处理
        let free = match self.dest.available_space().await {
            Some(free) => free,
            None => {
                warn!("无法确定 {} 所在磁盘的可用空间，按 0 处理", self.dest.name());
                0
            }
        };

        let enough = has_enough_space(free, total_bytes);
        debug!(
            "空间检查: 可用 {} 字节, 需要 {} 字节, 预留 {} 字节 -> {}",
            free, total_bytes, RESERVE_MARGIN, enough
        );
        enough
    }
}
