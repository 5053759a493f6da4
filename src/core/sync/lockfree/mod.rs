/*!
 * Lock-Free Synchronization Primitives
 *
 * - Treiber stack with epoch-based reclamation
 */

mod stack;

// Re-export public API
pub use stack::LockFreeStack;
