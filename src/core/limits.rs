/*!
 * Limits and Constants
 *
 * Centralized location for toolkit-wide limits and default tuning values.
 */

// =============================================================================
// BOUNDED QUEUE
// =============================================================================

/// Largest capacity accepted by a bounded queue
pub const MAX_QUEUE_CAPACITY: usize = i32::MAX as usize;

/// Upper bound on the buffer allocated up front by a bounded queue
/// [PERF] Larger queues grow on demand instead of reserving their full capacity
pub const QUEUE_PREALLOC_LIMIT: usize = 1024;

// =============================================================================
// KEYED LOCK TABLES
// =============================================================================

/// Initial number of slots reserved in a keyed lock table
pub const DEFAULT_TABLE_CAPACITY: usize = 16;

// =============================================================================
// SPIN LOCK
// =============================================================================

/// Spins before a yielding spin lock hands its time slice back to the scheduler
/// [PERF] Matches the tight-spin phase of adaptive backoff
pub const DEFAULT_SPIN_YIELD_THRESHOLD: u32 = 64;

/// Spins used by the low-latency preset before yielding
pub const LOW_LATENCY_SPIN_YIELD_THRESHOLD: u32 = 1024;

/// Spins used by the contended preset before yielding
pub const CONTENDED_SPIN_YIELD_THRESHOLD: u32 = 8;
