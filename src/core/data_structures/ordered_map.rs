/*!
 * Thread-Safe Ordered Map
 *
 * Unbalanced binary search tree behind one coarse mutex. Duplicate keys are
 * kept side by side (multi-map): every insert adds a node, equal keys go to
 * the right subtree.
 *
 * # Design: Index Arena Over Boxed Nodes
 *
 * Nodes live in a slab owned by the tree and refer to each other by index.
 * Parent links are plain indices, so the back-references needed by deletion
 * carry no ownership and no `unsafe`. Freed slots are recycled through a
 * free list.
 *
 * # Enumeration
 *
 * Every structural mutation (insert, delete, clear) stamps the tree with a
 * fresh [`VersionStamp`]. An [`Enumerator`] captures the stamp when it is
 * created or reset and revalidates it, under the lock, on every step.
 */

use crate::core::errors::{SyncError, SyncResult};
use crate::core::traits::{Comparator, NaturalOrder};
use crate::core::types::VersionStamp;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};
use tracing::{debug, trace};

type NodeId = usize;

struct TreeNode<K, V> {
    key: K,
    value: V,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

struct Tree<K, V> {
    slots: Vec<Option<TreeNode<K, V>>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    count: usize,
    version: VersionStamp,
}

impl<K, V> Index<NodeId> for Tree<K, V> {
    type Output = TreeNode<K, V>;

    fn index(&self, id: NodeId) -> &TreeNode<K, V> {
        match &self.slots[id] {
            Some(node) => node,
            None => panic!("ordered map: dangling node index {}", id),
        }
    }
}

impl<K, V> IndexMut<NodeId> for Tree<K, V> {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode<K, V> {
        match &mut self.slots[id] {
            Some(node) => node,
            None => panic!("ordered map: dangling node index {}", id),
        }
    }
}

impl<K, V> Tree<K, V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            count: 0,
            version: VersionStamp::fresh(),
        }
    }

    fn alloc(&mut self, node: TreeNode<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn dealloc(&mut self, id: NodeId) -> TreeNode<K, V> {
        match self.slots[id].take() {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => panic!("ordered map: double free of node index {}", id),
        }
    }

    fn find<C: Comparator<K>>(&self, key: &K, comparator: &C) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self[id];
            current = match comparator.compare(key, &node.key) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    fn min_from(&self, start: Option<NodeId>) -> Option<NodeId> {
        let mut current = start?;
        while let Some(left) = self[current].left {
            current = left;
        }
        Some(current)
    }

    fn max_from(&self, start: Option<NodeId>) -> Option<NodeId> {
        let mut current = start?;
        while let Some(right) = self[current].right {
            current = right;
        }
        Some(current)
    }

    fn insert<C: Comparator<K>>(&mut self, key: K, value: V, comparator: &C) {
        let mut parent = None;
        let mut goes_left = false;
        let mut current = self.root;
        while let Some(id) = current {
            parent = Some(id);
            let node = &self[id];
            goes_left = comparator.compare(&key, &node.key) == Ordering::Less;
            current = if goes_left { node.left } else { node.right };
        }

        let id = self.alloc(TreeNode {
            key,
            value,
            left: None,
            right: None,
            parent,
        });

        match parent {
            None => self.root = Some(id),
            Some(p) if goes_left => self[p].left = Some(id),
            Some(p) => self[p].right = Some(id),
        }

        self.count += 1;
        self.version = VersionStamp::fresh();
    }

    /// Replace the subtree rooted at `old` with the one rooted at `new`
    fn transplant(&mut self, old: NodeId, new: Option<NodeId>) {
        let parent = self[old].parent;
        match parent {
            None => self.root = new,
            Some(p) if self[p].left == Some(old) => self[p].left = new,
            Some(p) => self[p].right = new,
        }
        if let Some(n) = new {
            self[n].parent = parent;
        }
    }

    fn remove(&mut self, id: NodeId) -> TreeNode<K, V> {
        let (left, right) = (self[id].left, self[id].right);
        match (left, right) {
            (None, _) => self.transplant(id, right),
            (_, None) => self.transplant(id, left),
            (Some(left), Some(right)) => {
                let successor = match self.min_from(Some(right)) {
                    Some(s) => s,
                    None => unreachable!("right subtree is non-empty"),
                };
                if self[successor].parent != Some(id) {
                    let successor_right = self[successor].right;
                    self.transplant(successor, successor_right);
                    self[successor].right = Some(right);
                    self[right].parent = Some(successor);
                }
                self.transplant(id, Some(successor));
                self[successor].left = Some(left);
                self[left].parent = Some(successor);
            }
        }

        self.count -= 1;
        self.version = VersionStamp::fresh();
        self.dealloc(id)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = None;
        self.count = 0;
        self.version = VersionStamp::fresh();
    }
}

/// Thread-safe ordered multi-map
///
/// Every operation takes the same internal lock; lookups return clones of
/// stored values rather than references into the tree.
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::data_structures::OrderedMap;
///
/// let map = OrderedMap::new();
/// map.insert(5, "five");
/// map.insert(3, "three");
/// map.insert(8, "eight");
///
/// assert_eq!(map.find_min(), Some("three"));
/// assert!(map.delete(&3));
/// assert_eq!(map.find(&3), None);
/// ```
pub struct OrderedMap<K, V, C = NaturalOrder> {
    tree: Mutex<Tree<K, V>>,
    comparator: C,
}

impl<K: Ord, V> OrderedMap<K, V, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Ord, V> Default for OrderedMap<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C: Comparator<K>> OrderedMap<K, V, C> {
    /// Create a map ordered by a caller-supplied three-way comparison
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            tree: Mutex::new(Tree::new()),
            comparator,
        }
    }

    /// Number of entries, duplicates included
    pub fn len(&self) -> usize {
        self.tree.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the first node found with a key equal to `key`
    pub fn find(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let tree = self.tree.lock();
        tree.find(key, &self.comparator)
            .map(|id| tree[id].value.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let tree = self.tree.lock();
        tree.find(key, &self.comparator).is_some()
    }

    /// Value stored under the smallest key
    pub fn find_min(&self) -> Option<V>
    where
        V: Clone,
    {
        let tree = self.tree.lock();
        tree.min_from(tree.root).map(|id| tree[id].value.clone())
    }

    /// Value stored under the largest key
    pub fn find_max(&self) -> Option<V>
    where
        V: Clone,
    {
        let tree = self.tree.lock();
        tree.max_from(tree.root).map(|id| tree[id].value.clone())
    }

    /// Add an entry; existing entries with an equal key are kept
    pub fn insert(&self, key: K, value: V) {
        self.tree.lock().insert(key, value, &self.comparator);
    }

    /// Remove one entry with a key equal to `key`
    ///
    /// Returns `false`, leaving the map untouched, when no such key exists.
    pub fn delete(&self, key: &K) -> bool {
        let mut tree = self.tree.lock();
        match tree.find(key, &self.comparator) {
            Some(id) => {
                tree.remove(id);
                true
            }
            None => false,
        }
    }

    /// Remove every entry with a key equal to `key`, returning how many
    pub fn delete_all(&self, key: &K) -> usize {
        let mut tree = self.tree.lock();
        let mut removed = 0;
        while let Some(id) = tree.find(key, &self.comparator) {
            tree.remove(id);
            removed += 1;
        }
        removed
    }

    pub fn clear(&self) {
        let mut tree = self.tree.lock();
        let dropped = tree.count;
        tree.clear();
        debug!(dropped_entries = dropped, "ordered map cleared");
    }

    /// Keys in ascending order, as of the call
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let tree = self.tree.lock();
        let mut keys = Vec::with_capacity(tree.count);
        let mut stack = Vec::new();
        let mut current = tree.root;

        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = tree[id].left;
            }
            if let Some(id) = stack.pop() {
                keys.push(tree[id].key.clone());
                current = tree[id].right;
            }
        }
        keys
    }

    /// Stamp of the most recent structural mutation
    pub fn version(&self) -> VersionStamp {
        self.tree.lock().version
    }

    /// Breadth-first enumeration of values, invalidated by any mutation
    pub fn enumerate(&self) -> Enumerator<'_, K, V, C> {
        Enumerator {
            map: self,
            stamp: self.version(),
            pending: VecDeque::new(),
            started: false,
            failed: false,
        }
    }
}

impl<K, V, C> fmt::Debug for OrderedMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.lock();
        f.debug_struct("OrderedMap")
            .field("len", &tree.count)
            .field("version", &tree.version)
            .finish()
    }
}

/// Snapshot-checked breadth-first cursor over an [`OrderedMap`]
///
/// [`Enumerator::step`] returns `Err(SyncError::ConcurrentModification)` for
/// every step taken after the map was mutated, until [`Enumerator::reset`] is
/// called. As an `Iterator` the error is yielded once and the sequence then
/// ends, so `for` loops and `filter_map` terminate.
pub struct Enumerator<'a, K, V, C> {
    map: &'a OrderedMap<K, V, C>,
    stamp: VersionStamp,
    pending: VecDeque<NodeId>,
    started: bool,
    failed: bool,
}

impl<K, V: Clone, C: Comparator<K>> Enumerator<'_, K, V, C> {
    /// Advance one value
    ///
    /// `Ok(None)` marks the end of the sequence.
    pub fn step(&mut self) -> SyncResult<Option<V>> {
        let tree = self.map.tree.lock();
        if tree.version != self.stamp {
            trace!(captured = %self.stamp, current = %tree.version, "stale enumerator step");
            return Err(SyncError::ConcurrentModification);
        }

        if !self.started {
            self.started = true;
            self.pending.extend(tree.root);
        }

        let Some(id) = self.pending.pop_front() else {
            return Ok(None);
        };
        let node = &tree[id];
        self.pending.extend(node.left);
        self.pending.extend(node.right);
        Ok(Some(node.value.clone()))
    }

    /// Recapture the map's current stamp and restart from its root
    pub fn reset(&mut self) {
        self.stamp = self.map.version();
        self.pending.clear();
        self.started = false;
        self.failed = false;
    }
}

impl<K, V: Clone, C: Comparator<K>> Iterator for Enumerator<'_, K, V, C> {
    type Item = SyncResult<V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.step().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> OrderedMap<i32, &'static str> {
        let map = OrderedMap::new();
        map.insert(5, "five");
        map.insert(3, "three");
        map.insert(8, "eight");
        map
    }

    #[test]
    fn test_basic_scenario() {
        let map = sample();
        assert_eq!(map.len(), 3);
        assert_eq!(map.find_min(), Some("three"));
        assert_eq!(map.find_max(), Some("eight"));

        assert!(map.delete(&3));
        assert_eq!(map.len(), 2);
        assert_eq!(map.find(&3), None);
    }

    #[test]
    fn test_empty_map() {
        let map = OrderedMap::<u8, u8>::new();
        assert!(map.is_empty());
        assert_eq!(map.find_min(), None);
        assert_eq!(map.find_max(), None);
        assert!(!map.delete(&1));
    }

    #[test]
    fn test_duplicates_coexist() {
        let map = OrderedMap::new();
        map.insert(1, 'a');
        map.insert(1, 'b');
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys(), vec![1, 1]);

        assert!(!map.delete(&2));
        assert_eq!(map.len(), 2);
        assert!(map.delete(&1));
        assert!(map.delete(&1));
        assert!(!map.delete(&1));
        assert!(map.is_empty());
    }

    #[test]
    fn test_delete_all() {
        let map = OrderedMap::new();
        for v in 0..4 {
            map.insert(7, v);
        }
        map.insert(2, 99);
        assert_eq!(map.delete_all(&7), 4);
        assert_eq!(map.keys(), vec![2]);
        assert_eq!(map.delete_all(&7), 0);
    }

    #[test]
    fn test_delete_node_with_two_children() {
        let map = OrderedMap::new();
        for key in [50, 30, 70, 20, 40, 60, 80, 65] {
            map.insert(key, key * 10);
        }

        // Successor 60 sits below the right child 70
        assert!(map.delete(&50));
        assert_eq!(map.keys(), vec![20, 30, 40, 60, 65, 70, 80]);
        assert_eq!(map.find(&65), Some(650));

        // Successor 80 is the direct right child
        assert!(map.delete(&70));
        assert_eq!(map.keys(), vec![20, 30, 40, 60, 65, 80]);
        assert_eq!(map.find_max(), Some(800));
    }

    #[test]
    fn test_slots_are_recycled() {
        let map = OrderedMap::new();
        map.insert(1, ());
        map.insert(2, ());
        map.delete(&1);
        map.insert(3, ());
        assert_eq!(map.tree.lock().slots.len(), 2);
        assert_eq!(map.keys(), vec![2, 3]);
    }

    #[test]
    fn test_clear_changes_version() {
        let map = sample();
        let before = map.version();
        map.clear();
        assert_ne!(before, map.version());
        assert!(map.is_empty());
        assert_eq!(map.find_min(), None);
    }

    #[test]
    fn test_failed_delete_keeps_version() {
        let map = sample();
        let before = map.version();
        assert!(!map.delete(&42));
        assert_eq!(before, map.version());
    }

    #[test]
    fn test_enumerate_breadth_first() {
        let map = sample();
        let values: Vec<_> = map.enumerate().collect::<SyncResult<_>>().unwrap();
        assert_eq!(values, vec!["five", "three", "eight"]);
    }

    #[test]
    fn test_enumerator_detects_mutation_and_resets() {
        let map = OrderedMap::new();
        map.insert(-100, -200);
        map.insert(100, 200);

        let mut cursor = map.enumerate();
        assert_eq!(cursor.step(), Ok(Some(-200)));
        map.insert(50, 100);
        assert_eq!(cursor.step(), Err(SyncError::ConcurrentModification));
        assert_eq!(cursor.step(), Err(SyncError::ConcurrentModification));

        cursor.reset();
        let values: Vec<_> = cursor.by_ref().collect::<SyncResult<_>>().unwrap();
        assert_eq!(values, vec![-200, 200, 100]);
        assert_eq!(cursor.step(), Ok(None));
    }

    #[test]
    fn test_iterator_ends_after_invalidation() {
        let map = OrderedMap::new();
        map.insert(1, 1);
        map.insert(2, 2);

        let mut cursor = map.enumerate();
        assert_eq!(cursor.next(), Some(Ok(1)));
        map.insert(3, 3);

        assert_eq!(cursor.next(), Some(Err(SyncError::ConcurrentModification)));
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.by_ref().take(1_000).count(), 0);
        // step() keeps reporting the stale snapshot
        assert_eq!(cursor.step(), Err(SyncError::ConcurrentModification));

        cursor.reset();
        assert_eq!(cursor.filter_map(Result::ok).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_custom_comparator() {
        let map = OrderedMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        map.insert(1, "one");
        map.insert(9, "nine");
        assert_eq!(map.find_min(), Some("nine"));
        assert_eq!(map.keys(), vec![9, 1]);
    }
}
