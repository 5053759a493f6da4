/*!
 * Bounded Blocking Queue
 *
 * Fixed-capacity FIFO hand-off buffer between producer and consumer threads.
 * Producers block while the buffer is full, consumers while it is empty.
 * `close()` is a one-way transition: consumers drain what is left and then
 * observe end-of-stream, producers fail fast.
 */

use crate::core::errors::{verify_in_range, SyncError, SyncResult};
use crate::core::limits::{MAX_QUEUE_CAPACITY, QUEUE_PREALLOC_LIMIT};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

struct QueueState<T> {
    buffer: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity blocking FIFO
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::data_structures::BoundedQueue;
///
/// let queue = BoundedQueue::new(2).unwrap();
/// queue.enqueue("a").unwrap();
/// queue.close();
/// assert_eq!(queue.dequeue(), Some("a"));
/// assert_eq!(queue.dequeue(), None);
/// ```
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// Fails with invalid-argument unless `1 <= capacity <= MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> SyncResult<Self> {
        verify_in_range(capacity, 1, MAX_QUEUE_CAPACITY, "capacity")?;

        Ok(Self {
            state: Mutex::new(QueueState {
                buffer: VecDeque::with_capacity(capacity.min(QUEUE_PREALLOC_LIMIT)),
                closed: false,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    /// Append `item`, blocking while the queue is full
    ///
    /// Fails with invalid-state if the queue is closed, including when it is
    /// closed while this producer is waiting for space.
    pub fn enqueue(&self, item: T) -> SyncResult<()> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(SyncError::invalid_state("enqueue on a closed queue"));
            }
            if state.buffer.len() < self.capacity {
                break;
            }
            self.not_full.wait(&mut state);
        }

        state.buffer.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty and open
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.buffer.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Remove the oldest item without blocking
    pub fn try_dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.buffer.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Stop accepting items and wake every blocked producer and consumer
    ///
    /// Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        debug!(remaining = state.buffer.len(), "bounded queue closed");
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocking iterator that dequeues until end-of-stream
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { queue: self }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &state.buffer.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Iterator returned by [`BoundedQueue::drain`]
pub struct Drain<'a, T> {
    queue: &'a BoundedQueue<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.dequeue()
    }
}
