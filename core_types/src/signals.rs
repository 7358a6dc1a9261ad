//! Readiness signals and the satisfied/satisfiable state pair

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Readiness bits reported by every resource kind.
    ///
    /// A resource kind that never uses a bit keeps it permanently out of its
    /// satisfiable set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Signals: u32 {
        /// Data or a message can be read
        const READABLE = 1 << 0;
        /// Data or a message can be written
        const WRITABLE = 1 << 1;
        /// The other end of the pipe has been closed
        const PEER_CLOSED = 1 << 2;
        /// Readable data has reached the configured read threshold
        const READ_THRESHOLD = 1 << 3;
        /// Free space has reached the configured write threshold
        const WRITE_THRESHOLD = 1 << 4;
    }
}

impl Signals {
    /// No signals
    pub const NONE: Signals = Signals::empty();
}

/// Current readiness of a resource
///
/// `satisfied` is what is true right now; `satisfiable` is what could still
/// become true. `satisfied` is always a subset of `satisfiable`, and once a bit
/// leaves `satisfiable` it never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalsState {
    /// Signals that currently hold
    pub satisfied: Signals,
    /// Signals that may hold now or in the future
    pub satisfiable: Signals,
}

impl SignalsState {
    /// Creates a state pair
    pub fn new(satisfied: Signals, satisfiable: Signals) -> Self {
        debug_assert!(
            satisfiable.contains(satisfied),
            "satisfied {:?} not within satisfiable {:?}",
            satisfied,
            satisfiable
        );
        Self {
            satisfied,
            satisfiable,
        }
    }

    /// The state of a resource with no signals at all
    pub const fn none() -> Self {
        Self {
            satisfied: Signals::NONE,
            satisfiable: Signals::NONE,
        }
    }

    /// Returns true if any of `signals` currently holds
    pub fn satisfies(&self, signals: Signals) -> bool {
        self.satisfied.intersects(signals)
    }

    /// Returns true if any of `signals` may still hold
    pub fn can_satisfy(&self, signals: Signals) -> bool {
        self.satisfiable.intersects(signals)
    }

    /// Returns true if `satisfied` is a subset of `satisfiable`
    pub fn is_consistent(&self) -> bool {
        self.satisfiable.contains(self.satisfied)
    }
}

impl Default for SignalsState {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for SignalsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "satisfied={:#x} satisfiable={:#x}",
            self.satisfied.bits(),
            self.satisfiable.bits()
        )
    }
}
