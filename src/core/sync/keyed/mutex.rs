/*!
 * Keyed Mutex
 * Per-key exclusive locks materialized lazily in a shared table
 */

use super::table::{Lease, LockTable};
use crate::core::errors::SyncResult;
use crate::core::guard::{Guard, GuardMetadata};
use crate::core::sync::config::TableConfig;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use tracing::trace;

type KeyLock = Mutex<()>;

/// Mutual exclusion scoped to a key
///
/// Two holders of the same key never overlap; distinct keys never contend
/// beyond the brief table lookup. Each key's lock exists only while some
/// thread holds or waits for it.
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::sync::KeyedMutex;
///
/// let locks = KeyedMutex::new();
/// let a = locks.lock("account-1").unwrap();
/// let b = locks.lock("account-2").unwrap(); // different key, no blocking
/// assert_eq!(locks.len(), 2);
/// drop((a, b));
/// assert!(locks.is_empty());
/// ```
pub struct KeyedMutex<K, S = ahash::RandomState>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    table: LockTable<K, KeyLock, S>,
}

impl<K> KeyedMutex<K, ahash::RandomState>
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

impl<K> Default for KeyedMutex<K, ahash::RandomState>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> KeyedMutex<K, S>
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
            table: LockTable::with_config_and_hasher("keyed_mutex", config, hasher),
        }
    }

    /// Block until `key` is exclusively held by the caller
    ///
    /// Fails with invalid-state once the mutex has been disposed.
    pub fn lock(&self, key: K) -> SyncResult<KeyedMutexGuard<'_, K, S>> {
        let lease = self.table.lease(key)?;
        let held = lease.lock().lock_arc();
        trace!("keyed mutex acquired");

        Ok(KeyedMutexGuard {
            _held: held,
            metadata: GuardMetadata::new("keyed_mutex"),
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
    pub fn dispose(&self) {
        self.table.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.table.is_disposed()
    }
}

impl<K, S> fmt::Debug for KeyedMutex<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMutex")
            .field("live_keys", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Exclusive hold on one key of a [`KeyedMutex`]
pub struct KeyedMutexGuard<'a, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    // Field order is release order: unlock the key, then drop the table reference
    _held: ArcMutexGuard<RawMutex, ()>,
    metadata: GuardMetadata,
    lease: Lease<'a, K, KeyLock, S>,
}

impl<K, S> KeyedMutexGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// The key this guard holds
    pub fn key(&self) -> &K {
        self.lease.key()
    }
}

impl<K, S> Guard for KeyedMutexGuard<'_, K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn resource_type(&self) -> &'static str {
        "keyed_mutex"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}
