/*!
 * Guard Traits
 *
 * Core abstraction for RAII release handles
 */

use super::GuardMetadata;

/// Core guard trait
///
/// Implemented by every release handle in the toolkit. The resource is
/// released in `Drop`; [`Guard::release`] only makes the release point
/// explicit at the call site. Consuming `self` is what makes a double
/// release unrepresentable.
pub trait Guard {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Get guard metadata
    fn metadata(&self) -> &GuardMetadata;

    /// Release the resource now
    fn release(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}
