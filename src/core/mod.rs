pub mod comparator;
pub mod engine;
pub mod observer;
pub mod scanner;
pub mod space;

pub use comparator::FileComparator;
pub use engine::SyncSession;
pub use observer::{ChannelObserver, ProgressCallbacks, SilentObserver, SyncEvent, SyncObserver, SyncPhase};
pub use scanner::FileScanner;
pub use space::{has_enough_space, SpaceGuard, RESERVE_MARGIN};
