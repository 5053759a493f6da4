/*!
 * Data Structures
 *
 * Thread-safe containers:
 * - Bounded blocking queue for producer/consumer hand-off
 * - Ordered multi-map (unbalanced BST) with version-checked enumeration
 *
 * # Locking
 *
 * Both containers use one coarse lock per instance. The queue pairs it with
 * `not_empty`/`not_full` condvars; the map holds it for every read and write,
 * which is what lets enumerators validate their snapshot on each step.
 */

mod bounded_queue;
mod ordered_map;

pub use bounded_queue::{BoundedQueue, Drain};
pub use ordered_map::{Enumerator, OrderedMap};
