/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Result type for toolkit operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Recoverable failures surfaced by the toolkit
///
/// Programming-invariant violations (releasing a lock side that is not held,
/// a lock table losing track of a live entry) are not represented here: they
/// panic, because they indicate misuse of the scoped-release contract.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Invalid argument `{name}`: {reason}")]
    #[diagnostic(
        code(sync::invalid_argument),
        help("The value was rejected before any state was modified. Check the documented range.")
    )]
    InvalidArgument { name: String, reason: String },

    #[error("Invalid state: {0}")]
    #[diagnostic(
        code(sync::invalid_state),
        help("The structure was closed or disposed. Create a new instance instead of reusing it.")
    )]
    InvalidState(String),

    #[error("Collection was modified after the enumerator was created")]
    #[diagnostic(
        code(sync::concurrent_modification),
        help("Call reset() on the enumerator or start a new enumeration.")
    )]
    ConcurrentModification,
}

impl SyncError {
    /// Build an invalid-argument error for parameter `name`
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        SyncError::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Build an invalid-state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        SyncError::InvalidState(reason.into())
    }

    /// Whether the caller can recover without recreating the structure
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::ConcurrentModification)
    }
}

/// Check that `value` lies within `[lower, upper]`
pub fn verify_in_range<T>(value: T, lower: T, upper: T, name: &str) -> SyncResult<()>
where
    T: PartialOrd + Display,
{
    if value < lower || value > upper {
        return Err(SyncError::invalid_argument(
            name,
            format!("value {} is out of range [{}; {}]", value, lower, upper),
        ));
    }
    Ok(())
}

/// Fail with invalid-state if `disposed` is set
#[inline]
pub fn verify_not_disposed(disposed: bool, what: &str) -> SyncResult<()> {
    if disposed {
        return Err(SyncError::invalid_state(format!("{} has been disposed", what)));
    }
    Ok(())
}
