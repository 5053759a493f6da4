/*!
 * Sync Toolkit Library
 * Concurrency primitives for coordinating shared, keyed, and ordered state
 * across OS threads
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::data_structures::{BoundedQueue, Enumerator, OrderedMap};
pub use crate::core::errors::{SyncError, SyncResult};
pub use crate::core::guard::Guard;
pub use crate::core::sync::{
    KeyedMutex, KeyedRwMonitor, LockFreeStack, ReadWriteLock, SpinLock, SyncConfig,
};
pub use crate::core::traits::{Comparator, NaturalOrder};
pub use crate::core::types::VersionStamp;
pub use monitoring::init_tracing;
