//! Opaque handle values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a kernel resource
///
/// A handle is a small integer key into one handle table. The same value in
/// two different tables names two unrelated resources (or nothing at all).
/// The value `0` is never issued and serves as the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The invalid handle sentinel
    pub const INVALID: Handle = Handle(0);

    /// Creates a handle from its raw value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns true unless this is the invalid sentinel
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}
