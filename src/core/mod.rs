/*!
 * Core Module
 * Concurrency primitives, containers, and their shared error and guard types
 */

pub mod data_structures;
pub mod errors;
pub mod guard;
pub mod limits;
pub mod sync;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use guard::{Guard, GuardMetadata};
pub use traits::*;
pub use types::*;
