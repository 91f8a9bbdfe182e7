pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

pub use crate::core::{
    ChannelObserver, FileComparator, ProgressCallbacks, SilentObserver, SyncEvent, SyncObserver,
    SyncSession,
};
pub use error::SyncError;
pub use models::{FileRecord, RepositoryRoot, SyncMethod, SyncOutcome};
pub use storage::{LocalStorage, PruneReport, Storage};
