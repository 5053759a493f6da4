/*!
 * Lock-Based Synchronization Primitives
 *
 * - Spin lock (busy-wait, for very short critical sections)
 * - Reader/writer lock (monitor-based, writer preference)
 */

mod rw;
mod spin;

// Re-export public API
pub use rw::{ReadLockGuard, ReadWriteLock, WriteLockGuard};
pub use spin::{SpinLock, SpinLockGuard};
