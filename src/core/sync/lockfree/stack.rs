/*!
 * Lock-Free Stack
 * Treiber stack over an atomic head pointer with epoch-based reclamation
 */

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::Ordering;

struct Node<T> {
    value: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

/// Lock-free LIFO stack
///
/// # Performance
///
/// - **Push/pop**: one CAS on the head in the uncontended case
/// - **Allocation**: one node per push, nothing else
/// - **Progress**: lock-free; a failed CAS means another thread succeeded
///
/// # Safety
///
/// Popped nodes are handed to crossbeam-epoch and only deallocated after
/// every thread that could still be reading them has unpinned, so a pop
/// racing with another pop never touches freed memory. Ownership of the
/// payload moves to the popping thread on a successful CAS.
pub struct LockFreeStack<T> {
    head: Atomic<Node<T>>,
}

// SAFETY: values are moved in by push and out by exactly one pop
unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T> LockFreeStack<T> {
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
        }
    }

    /// Push a value onto the top of the stack
    pub fn push(&self, value: T) {
        let mut node = Owned::new(Node {
            value: ManuallyDrop::new(value),
            next: Atomic::null(),
        });

        let guard = epoch::pin();
        loop {
            let head = self.head.load(Ordering::Relaxed, &guard);
            node.next.store(head, Ordering::Relaxed);

            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed, &guard)
            {
                Ok(_) => return,
                Err(e) => node = e.new,
            }
        }
    }

    /// Pop the most recently pushed value, or `None` if the stack is empty
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            // SAFETY: the node cannot be reclaimed while `guard` is pinned
            let head_ref = unsafe { head.as_ref() }?;
            let next = head_ref.next.load(Ordering::Relaxed, &guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Relaxed, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // SAFETY: the CAS unlinked the node, so this thread is the only
                // one that will read the value out; the node itself is freed
                // once all current readers unpin
                unsafe {
                    let value = ptr::read(&*head_ref.value);
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }
        }
    }

    /// Whether the stack was empty at the moment of the check
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        self.head.load(Ordering::Acquire, &guard).is_null()
    }
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T> fmt::Debug for LockFreeStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeStack")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_pop_returns_none() {
        let stack = LockFreeStack::<String>::new();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_lifo_order() {
        let stack = LockFreeStack::new();
        stack.push("first");
        stack.push("second");
        stack.push("third");

        assert_eq!(stack.pop(), Some("third"));
        assert_eq!(stack.pop(), Some("second"));
        assert_eq!(stack.pop(), Some("first"));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_drop_releases_remaining_values() {
        let drops = Arc::new(AtomicUsize::new(0));

        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let stack = LockFreeStack::new();
            for _ in 0..5 {
                stack.push(Tracked(drops.clone()));
            }
            drop(stack.pop());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }

        assert_eq!(drops.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_concurrent_push_pop_conserves_values() {
        let stack = Arc::new(LockFreeStack::new());
        let threads = 8;
        let per_thread = 2_000;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let stack = stack.clone();
                thread::spawn(move || {
                    let mut popped = Vec::new();
                    for i in 0..per_thread {
                        stack.push(t * per_thread + i);
                        if i % 2 == 0 {
                            popped.extend(stack.pop());
                        }
                    }
                    popped
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "value {} popped twice", value);
            }
        }
        while let Some(value) = stack.pop() {
            assert!(seen.insert(value), "value {} popped twice", value);
        }

        assert_eq!(seen.len(), threads * per_thread);
    }
}
