/*!
 * Synchronization Primitives
 *
 * Building blocks for coordinating shared, keyed, or ordered state across
 * OS threads:
 * - Lock-free stack (never blocks)
 * - Spin lock (busy-waits, never parks)
 * - Reader/writer lock (condvar monitor, writer preference)
 * - Keyed mutex and keyed reader/writer monitor (per-key locks in a
 *   usage-counted table)
 *
 * # Blocking
 *
 * Nothing here supports timeouts or cancellation: every blocking call waits
 * until its condition holds. Callers that need cancellation layer it on top.
 */

mod config;
mod keyed;
mod locks;
mod lockfree;

pub use config::{SpinConfig, SpinStrategy, SyncConfig, TableConfig};
pub use keyed::{KeyedMutex, KeyedMutexGuard, KeyedReadGuard, KeyedRwMonitor, KeyedWriteGuard};
pub use lockfree::LockFreeStack;
pub use locks::{ReadLockGuard, ReadWriteLock, SpinLock, SpinLockGuard, WriteLockGuard};
