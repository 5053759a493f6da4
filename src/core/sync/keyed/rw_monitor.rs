/*!
 * Keyed Reader/Writer Monitor
 *
 * Per-key shared/exclusive locking over the same lazily populated,
 * usage-counted table as the keyed mutex. Each entry wraps a
 * [`ReadWriteLock`], so readers of a key overlap freely while a writer
 * excludes everyone else on that key only.
 *
 * # Release Order
 *
 * A guard exits its side of the per-key lock in `Drop`, outside the table
 * lock, and only then lets its lease decrement the usage count. Acquisition
 * mirrors this: the lease is taken first, and if entering the lock unwinds
 * the lease rolls the count back on the way out.
 */

use super::table::{Lease, LockTable};
use crate::core::errors::SyncResult;
use crate::core::guard::{Guard, GuardMetadata};
use crate::core::sync::config::TableConfig;
use crate::core::sync::locks::ReadWriteLock;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use tracing::trace;

/// Reader/writer locking scoped to a key
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::sync::KeyedRwMonitor;
///
/// let monitor = KeyedRwMonitor::new();
/// let r1 = monitor.lock_for_read("doc").unwrap();
/// let r2 = monitor.lock_for_read("doc").unwrap(); // readers share
/// let w = monitor.lock_for_write("other").unwrap(); // other keys are independent
/// drop((r1, r2, w));
/// assert!(monitor.is_empty());
/// ```
pub struct KeyedRwMonitor<K, S = ahash::RandomState>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    table: LockTable<K, ReadWriteLock, S>,
}

impl<K> KeyedRwMonitor<K, ahash::RandomState>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self::with_config_and_hasher(config, ahash::RandomState::new())
    }
}

impl<K> Default for KeyedRwMonitor<K, ahash::RandomState>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> KeyedRwMonitor<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Use a caller-supplied hashing capability for keys
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(TableConfig::default(), hasher)
    }

    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Self {
        Self {
            table: LockTable::with_config_and_hasher("keyed_rw_monitor", config, hasher),
        }
    }

    /// Block until shared access to `key` is granted
    pub fn lock_for_read(&self, key: K) -> SyncResult<KeyedReadGuard<'_, K, S>> {
        let lease = self.table.lease(key)?;
        lease.lock().enter_read_lock();
        trace!("keyed read lock acquired");

        Ok(KeyedReadGuard {
            metadata: GuardMetadata::new("keyed_read"),
            lease,
        })
    }

    /// Block until exclusive access to `key` is granted
    pub fn lock_for_write(&self, key: K) -> SyncResult<KeyedWriteGuard<'_, K, S>> {
        let lease = self.table.lease(key)?;
        lease.lock().enter_write_lock();
        trace!("keyed write lock acquired");

        Ok(KeyedWriteGuard {
            metadata: GuardMetadata::new("keyed_write"),
            lease,
        })
    }

    /// Number of keys currently held or awaited
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Holders plus waiters currently referencing `key`
    pub fn usages(&self, key: &K) -> usize {
        self.table.usages(key)
    }

    /// Drop every entry and refuse further acquisitions
    ///
    /// Guards still outstanding release their per-key lock normally.
    pub fn dispose(&self) {
        self.table.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.table.is_disposed()
    }
}

impl<K, S> fmt::Debug for KeyedRwMonitor<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRwMonitor")
            .field("live_keys", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Shared hold on one key of a [`KeyedRwMonitor`]
pub struct KeyedReadGuard<'a, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    metadata: GuardMetadata,
    lease: Lease<'a, K, ReadWriteLock, S>,
}

impl<K, S> KeyedReadGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        self.lease.key()
    }
}

impl<K, S> Guard for KeyedReadGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn resource_type(&self) -> &'static str {
        "keyed_read"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}

impl<K, S> Drop for KeyedReadGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn drop(&mut self) {
        // The lease field drops after this, decrementing the usage count
        self.lease.lock().exit_read_lock();
    }
}

/// Exclusive hold on one key of a [`KeyedRwMonitor`]
pub struct KeyedWriteGuard<'a, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    metadata: GuardMetadata,
    lease: Lease<'a, K, ReadWriteLock, S>,
}

impl<K, S> KeyedWriteGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        self.lease.key()
    }
}

impl<K, S> Guard for KeyedWriteGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn resource_type(&self) -> &'static str {
        "keyed_write"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}

impl<K, S> Drop for KeyedWriteGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn drop(&mut self) {
        self.lease.lock().exit_write_lock();
    }
}
