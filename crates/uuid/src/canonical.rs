//! Canonical UUID wrapper.

use std::fmt;
use uuid::Uuid;

/// A random version 4 UUID that is always rendered as 32 lowercase hex characters without
/// hyphens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalUuid(Uuid);

impl Default for CanonicalUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalUuid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CanonicalUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
