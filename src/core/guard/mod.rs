/*!
 * Scoped Release Guards
 *
 * Every "enter lock" operation in the toolkit returns a guard whose only
 * behavioral contract is that dropping it restores the prior state exactly
 * once. Release therefore runs on every exit path, including unwinding.
 *
 * ## Guard Types
 *
 * - **SpinLockGuard**: Spin lock held, derefs to the protected value
 * - **ReadLockGuard / WriteLockGuard**: One side of a reader/writer lock
 * - **KeyedMutexGuard**: Exclusive access to one key
 * - **KeyedReadGuard / KeyedWriteGuard**: Shared/exclusive access to one key
 *
 * ## Example
 *
 * ```rust
 * use sync_toolkit::core::sync::KeyedMutex;
 *
 * let locks = KeyedMutex::<u32>::new();
 * {
 *     let _guard = locks.lock(7).unwrap();
 *     // key 7 is held here
 * } // released on drop
 * assert!(locks.is_empty());
 * ```
 */

mod traits;

pub use traits::Guard;

use std::time::Instant;

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: Instant::now(),
        }
    }
}
