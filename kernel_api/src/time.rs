//! Time abstractions
//!
//! All kernel time is expressed in microseconds. [`TimeTicks`] is a point on
//! the kernel's monotonic clock; [`Deadline`] is a relative timeout handed to
//! the wait operations.

use core::ops::{Add, Sub};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point on the monotonic clock
///
/// Ticks count microseconds since an arbitrary per-process origin. A value
/// read from the clock is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeTicks {
    micros: u64,
}

impl TimeTicks {
    /// Creates ticks from microseconds
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    /// Returns microseconds since the clock origin
    pub const fn as_micros(&self) -> u64 {
        self.micros
    }

    /// Returns the microseconds elapsed since an earlier point
    pub const fn micros_since(&self, earlier: TimeTicks) -> u64 {
        self.micros.saturating_sub(earlier.micros)
    }
}

impl Add<Deadline> for TimeTicks {
    type Output = TimeTicks;

    fn add(self, deadline: Deadline) -> Self::Output {
        TimeTicks::from_micros(self.micros.saturating_add(deadline.micros))
    }
}

impl Sub for TimeTicks {
    type Output = Deadline;

    fn sub(self, earlier: TimeTicks) -> Self::Output {
        Deadline::from_micros(self.micros_since(earlier))
    }
}

/// A relative wait timeout in microseconds
///
/// [`Deadline::IMMEDIATE`] polls without blocking and
/// [`Deadline::INDEFINITE`] blocks until the wait resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deadline {
    micros: u64,
}

impl Deadline {
    /// Do not block
    pub const IMMEDIATE: Deadline = Deadline { micros: 0 };

    /// Block without a time limit
    pub const INDEFINITE: Deadline = Deadline { micros: u64::MAX };

    /// Creates a deadline from microseconds
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    /// Creates a deadline from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            micros: millis.saturating_mul(1_000),
        }
    }

    /// Returns the timeout in microseconds
    pub const fn as_micros(&self) -> u64 {
        self.micros
    }

    /// Returns true for a polling deadline
    pub const fn is_immediate(&self) -> bool {
        self.micros == 0
    }

    /// Returns true for a deadline that never expires
    pub const fn is_indefinite(&self) -> bool {
        self.micros == u64::MAX
    }

    /// Converts to a standard duration; `None` when indefinite
    pub fn to_duration(&self) -> Option<Duration> {
        if self.is_indefinite() {
            None
        } else {
            Some(Duration::from_micros(self.micros))
        }
    }
}

impl From<Duration> for Deadline {
    fn from(duration: Duration) -> Self {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        Deadline::from_micros(micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_constants() {
        assert!(Deadline::IMMEDIATE.is_immediate());
        assert!(!Deadline::IMMEDIATE.is_indefinite());
        assert!(Deadline::INDEFINITE.is_indefinite());
        assert_eq!(Deadline::INDEFINITE.to_duration(), None);
        assert_eq!(Deadline::IMMEDIATE.to_duration(), Some(Duration::ZERO));
    }

    #[test]
    fn test_deadline_conversion() {
        assert_eq!(Deadline::from_millis(5), Deadline::from_micros(5_000));
        assert_eq!(
            Deadline::from(Duration::from_millis(2)),
            Deadline::from_micros(2_000)
        );
        assert_eq!(Deadline::from(Duration::MAX), Deadline::INDEFINITE);
    }

    #[test]
    fn test_ticks_arithmetic() {
        let start = TimeTicks::from_micros(1_000);
        let end = start + Deadline::from_micros(500);
        assert_eq!(end.as_micros(), 1_500);
        assert_eq!(end - start, Deadline::from_micros(500));
        assert_eq!(start.micros_since(end), 0);
    }

    #[test]
    fn test_ticks_saturate() {
        let start = TimeTicks::from_micros(10);
        assert_eq!((start + Deadline::INDEFINITE).as_micros(), u64::MAX);
    }
}
