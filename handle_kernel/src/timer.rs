//! # Monotonic Clock
//!
//! Source of [`TimeTicks`] for the whole process.
//!
//! ## Philosophy
//!
//! **Ticks are relative, not wall time.**
//!
//! The clock origin is fixed the first time any kernel reads the clock.
//! Readings are microseconds since that origin, offset by one so that a
//! reading is never zero.

use kernel_api::TimeTicks;
use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Reads the monotonic clock
pub fn time_ticks_now() -> TimeTicks {
    let origin = *ORIGIN.get_or_init(Instant::now);
    let elapsed = u64::try_from(origin.elapsed().as_micros()).unwrap_or(u64::MAX - 1);
    TimeTicks::from_micros(elapsed.saturating_add(1))
}
