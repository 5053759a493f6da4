/*!
 * Core Types
 * Small value types shared across the toolkit
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token regenerated on every structural mutation of a container
///
/// Only equality is meaningful: two stamps carry no ordering or causal
/// relationship beyond "same" or "different".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionStamp(Uuid);

impl VersionStamp {
    /// Generate a new stamp, distinct from every previously issued one
    #[inline]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VersionStamp {
    fn default() -> Self {
        Self::fresh()
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
