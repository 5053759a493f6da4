/*!
 * Reference-Counted Lock Table
 *
 * Maps keys to lazily created lock primitives. An entry lives exactly as long
 * as some caller references it: it is created by the first lease for its key
 * and removed, under the table lock, when the last lease is dropped.
 *
 * # Design: Leases Instead of Unlock Calls
 *
 * `LockTable::lease` increments the entry's usage counter and returns a
 * [`Lease`] that decrements it on drop. A keyed guard stores its lease as its
 * last field, so the per-key primitive is always released (by the guard's
 * own fields or `Drop`) before the usage count drops. If acquiring the
 * primitive unwinds, the lease is dropped on the way out and the count is
 * rolled back, so a failed acquisition never leaves a phantom entry.
 *
 * The table mutex only guards the map; per-key primitives are acquired and
 * released outside it, so a slow holder of one key never delays another key.
 */

use crate::core::errors::{verify_not_disposed, SyncResult};
use crate::core::sync::config::TableConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use tracing::{debug, trace};

struct LockTableEntry<L> {
    lock: Arc<L>,
    usages: usize,
}

struct TableState<K, L, S> {
    entries: HashMap<K, LockTableEntry<L>, S>,
    disposed: bool,
}

/// Shared key -> lock table with usage counting
pub(crate) struct LockTable<K, L, S> {
    name: &'static str,
    state: Mutex<TableState<K, L, S>>,
}

impl<K, L, S> LockTable<K, L, S>
where
    K: Hash + Eq + Clone,
    L: Default,
    S: BuildHasher,
{
    pub(crate) fn with_config_and_hasher(name: &'static str, config: TableConfig, hasher: S) -> Self {
        Self {
            name,
            state: Mutex::new(TableState {
                entries: HashMap::with_capacity_and_hasher(config.initial_capacity, hasher),
                disposed: false,
            }),
        }
    }

    /// Reference the entry for `key`, creating it if absent
    pub(crate) fn lease(&self, key: K) -> SyncResult<Lease<'_, K, L, S>> {
        let mut state = self.state.lock();
        verify_not_disposed(state.disposed, self.name)?;

        let entry = state.entries.entry(key.clone()).or_insert_with(|| {
            trace!(table = self.name, "lock table entry created");
            LockTableEntry {
                lock: Arc::new(L::default()),
                usages: 0,
            }
        });
        entry.usages += 1;
        let lock = entry.lock.clone();
        drop(state);

        Ok(Lease {
            table: self,
            key,
            lock,
        })
    }

    fn release(&self, key: &K) {
        let mut state = self.state.lock();
        if state.disposed {
            // Entries were dropped wholesale by dispose
            return;
        }

        let Some(entry) = state.entries.get_mut(key) else {
            panic!("{}: released a key with no live table entry", self.name);
        };
        assert!(entry.usages > 0, "{}: usage counter underflow", self.name);

        entry.usages -= 1;
        if entry.usages == 0 {
            state.entries.remove(key);
            trace!(table = self.name, "lock table entry removed");
        }
    }

    /// Number of live entries
    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Usage count for `key`, or 0 when it has no entry
    pub(crate) fn usages(&self, key: &K) -> usize {
        self.state
            .lock()
            .entries
            .get(key)
            .map_or(0, |entry| entry.usages)
    }

    /// Drop every entry and refuse further leases
    ///
    /// Outstanding leases stay valid: their primitives are kept alive by the
    /// `Arc` they hold, and their release skips table bookkeeping.
    pub(crate) fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(table = self.name, dropped_entries = dropped, "lock table disposed");
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

/// One counted reference to a table entry
pub(crate) struct Lease<'a, K, L, S>
where
    K: Hash + Eq + Clone,
    L: Default,
    S: BuildHasher,
{
    table: &'a LockTable<K, L, S>,
    key: K,
    lock: Arc<L>,
}

impl<K, L, S> Lease<'_, K, L, S>
where
    K: Hash + Eq + Clone,
    L: Default,
    S: BuildHasher,
{
    #[inline]
    pub(crate) fn lock(&self) -> &Arc<L> {
        &self.lock
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }
}

impl<K, L, S> Drop for Lease<'_, K, L, S>
where
    K: Hash + Eq + Clone,
    L: Default,
    S: BuildHasher,
{
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SyncError;
    use std::collections::hash_map::RandomState;

    type TestTable = LockTable<&'static str, (), RandomState>;

    fn table() -> TestTable {
        LockTable::with_config_and_hasher("test", TableConfig::default(), RandomState::new())
    }

    #[test]
    fn test_entry_lives_while_leased() {
        let table = table();
        let a = table.lease("a").unwrap();
        let a2 = table.lease("a").unwrap();
        let b = table.lease("b").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.usages(&"a"), 2);
        assert!(Arc::ptr_eq(a.lock(), a2.lock()));
        assert!(!Arc::ptr_eq(a.lock(), b.lock()));

        drop(a);
        assert_eq!(table.usages(&"a"), 1);
        drop(a2);
        assert_eq!(table.usages(&"a"), 0);
        assert_eq!(table.len(), 1);

        drop(b);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_relisting_allocates_fresh_primitive() {
        let table = table();
        let first = Arc::downgrade(table.lease("k").unwrap().lock());
        assert!(first.upgrade().is_none());

        let second = table.lease("k").unwrap();
        assert_eq!(second.key(), &"k");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lease_rolled_back_on_unwind() {
        let table = table();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = table.lease("k").unwrap();
            panic!("acquisition failed");
        }));

        assert!(result.is_err());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_dispose_rejects_new_leases() {
        let table = table();
        let outstanding = table.lease("k").unwrap();

        table.dispose();
        table.dispose();
        assert!(table.is_disposed());
        assert_eq!(table.len(), 0);
        assert!(matches!(table.lease("k"), Err(SyncError::InvalidState(_))));

        // Releasing after dispose is not an invariant violation
        drop(outstanding);
    }
}
