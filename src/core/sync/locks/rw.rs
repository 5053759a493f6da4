/*!
 * Monitor-Based Reader/Writer Lock
 *
 * One exclusive writer or any number of concurrent readers over a single
 * logical resource, built from a mutex-protected state word and one condvar.
 *
 * # Admission Rules
 *
 * - A writer first waits for any pending writer request to clear, registers
 *   its own request, then waits for active readers to drain.
 * - A reader waits while a writer request is registered.
 *
 * Once a writer has registered, newly arriving readers queue behind it
 * (writer preference), while a second writer must wait for the first to
 * finish before it can register.
 */

use crate::core::guard::{Guard, GuardMetadata};
use parking_lot::{Condvar, Mutex};
use std::fmt;

#[derive(Debug, Default)]
struct RwState {
    readers: usize,
    writer_requested: bool,
}

/// Reader/writer lock with writer preference
///
/// The `enter_*`/`exit_*` pairs form the raw interface; [`ReadWriteLock::read`]
/// and [`ReadWriteLock::write`] wrap them in release guards.
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::sync::ReadWriteLock;
///
/// let lock = ReadWriteLock::new();
/// {
///     let _a = lock.read();
///     let _b = lock.read();
///     assert_eq!(lock.reader_count(), 2);
/// }
/// let _w = lock.write();
/// assert!(lock.is_write_requested());
/// ```
#[derive(Default)]
pub struct ReadWriteLock {
    state: Mutex<RwState>,
    changed: Condvar,
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until exclusive access is granted
    pub fn enter_write_lock(&self) {
        let mut state = self.state.lock();
        while state.writer_requested {
            self.changed.wait(&mut state);
        }
        state.writer_requested = true;
        while state.readers > 0 {
            self.changed.wait(&mut state);
        }
    }

    /// Block until shared access is granted
    pub fn enter_read_lock(&self) {
        let mut state = self.state.lock();
        while state.writer_requested {
            self.changed.wait(&mut state);
        }
        state.readers += 1;
    }

    /// Release exclusive access
    ///
    /// # Panics
    ///
    /// Panics if no writer is registered.
    pub fn exit_write_lock(&self) {
        let mut state = self.state.lock();
        assert!(
            state.writer_requested,
            "exit_write_lock called without a registered writer"
        );
        state.writer_requested = false;
        self.changed.notify_all();
    }

    /// Release shared access
    ///
    /// # Panics
    ///
    /// Panics if no reader holds the lock.
    pub fn exit_read_lock(&self) {
        let mut state = self.state.lock();
        assert!(state.readers > 0, "exit_read_lock called without an active reader");
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_all();
        }
    }

    /// Acquire shared access, released when the guard drops
    pub fn read(&self) -> ReadLockGuard<'_> {
        self.enter_read_lock();
        ReadLockGuard {
            lock: self,
            metadata: GuardMetadata::new("rw_read"),
        }
    }

    /// Acquire exclusive access, released when the guard drops
    pub fn write(&self) -> WriteLockGuard<'_> {
        self.enter_write_lock();
        WriteLockGuard {
            lock: self,
            metadata: GuardMetadata::new("rw_write"),
        }
    }

    /// Number of readers currently holding the lock
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers
    }

    /// Whether a writer holds or is waiting for the lock
    pub fn is_write_requested(&self) -> bool {
        self.state.lock().writer_requested
    }
}

impl fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReadWriteLock")
            .field("readers", &state.readers)
            .field("writer_requested", &state.writer_requested)
            .finish()
    }
}

/// Shared access to a [`ReadWriteLock`]
pub struct ReadLockGuard<'a> {
    lock: &'a ReadWriteLock,
    metadata: GuardMetadata,
}

impl Guard for ReadLockGuard<'_> {
    fn resource_type(&self) -> &'static str {
        "rw_read"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}

impl Drop for ReadLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.exit_read_lock();
    }
}

/// Exclusive access to a [`ReadWriteLock`]
pub struct WriteLockGuard<'a> {
    lock: &'a ReadWriteLock,
    metadata: GuardMetadata,
}

impl Guard for WriteLockGuard<'_> {
    fn resource_type(&self) -> &'static str {
        "rw_write"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}

impl Drop for WriteLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.exit_write_lock();
    }
}
