/*!
 * Spin Lock
 *
 * Busy-wait mutual exclusion over a single atomic flag, for critical sections
 * of a handful of instructions.
 *
 * # Design: Test-and-Test-and-Set
 *
 * Waiters spin on a relaxed load and only attempt the compare-exchange once
 * the flag reads unlocked, which keeps the cache line shared while the lock
 * is held. Between attempts the configured backoff either issues the CPU spin
 * hint or, past a threshold, yields the time slice. The lock never parks or
 * sleeps the thread.
 */

use crate::core::guard::{Guard, GuardMetadata};
use crate::core::sync::config::{SpinConfig, SpinStrategy};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Backoff state for a single acquisition attempt
struct Backoff {
    config: SpinConfig,
    spins: u32,
}

impl Backoff {
    #[inline]
    fn new(config: SpinConfig) -> Self {
        Self { config, spins: 0 }
    }

    #[inline]
    fn snooze(&mut self) {
        match self.config.strategy {
            SpinStrategy::SpinThenYield if self.spins >= self.config.yield_after => {
                thread::yield_now();
            }
            _ => std::hint::spin_loop(),
        }
        self.spins = self.spins.saturating_add(1);
    }
}

/// Spin lock protecting a value of type `T`
///
/// `SpinLock<()>` is a bare lock whose guard is only a release handle.
///
/// # Example
///
/// ```rust
/// use sync_toolkit::core::sync::SpinLock;
///
/// let counter = SpinLock::new(0u64);
/// *counter.lock() += 1;
/// assert_eq!(*counter.lock(), 1);
/// ```
pub struct SpinLock<T: ?Sized = ()> {
    locked: AtomicBool,
    config: SpinConfig,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Create an unlocked spin lock with the default backoff
    pub fn new(value: T) -> Self {
        Self::with_config(value, SpinConfig::default())
    }

    /// Create an unlocked spin lock with explicit backoff configuration
    pub fn with_config(value: T, config: SpinConfig) -> Self {
        Self {
            locked: AtomicBool::new(false),
            config,
            value: UnsafeCell::new(value),
        }
    }

    /// Consume the lock, returning the protected value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Spin until the lock is acquired
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let mut backoff = Backoff::new(self.config);
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinLockGuard::new(self);
            }
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    /// Single acquisition attempt
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard::new(self))
    }

    /// Whether some thread currently holds the lock (racy, for diagnostics)
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Mutable access without locking; the borrow proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    #[inline]
    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Release handle for a held [`SpinLock`]
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
    metadata: GuardMetadata,
    // Sharing the guard shares `&T`
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: ?Sized> SpinLockGuard<'a, T> {
    #[inline]
    fn new(lock: &'a SpinLock<T>) -> Self {
        Self {
            lock,
            metadata: GuardMetadata::new("spin_lock"),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the flag is held
        unsafe { &*self.lock.value.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the flag is held
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T: ?Sized> Guard for SpinLockGuard<'_, T> {
    fn resource_type(&self) -> &'static str {
        "spin_lock"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
