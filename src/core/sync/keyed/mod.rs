/*!
 * Keyed Locks
 *
 * Locks scoped to arbitrary keys, created lazily in a shared usage-counted
 * table and removed as soon as no thread holds or waits for them:
 * - Keyed mutex (exclusive per key)
 * - Keyed reader/writer monitor (shared/exclusive per key)
 */

mod mutex;
mod rw_monitor;
mod table;

// Re-export public API
pub use mutex::{KeyedMutex, KeyedMutexGuard};
pub use rw_monitor::{KeyedReadGuard, KeyedRwMonitor, KeyedWriteGuard};
