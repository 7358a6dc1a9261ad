//! # Handle Kernel
//!
//! This crate implements the IPC kernel behind the `kernel_api` contract:
//! message pipes, data pipes, shared buffers and one readiness model to wait
//! on all of them.
//!
//! ## Structure
//!
//! - [`System`]: one handle namespace; every operation is a method on it
//! - [`dispatcher`]: what a handle refers to
//! - [`waiter`] and [`wait`]: registration, wake-up, blocking and async waits
//! - [`audit`]: per-system trail of handle lifecycle events
//! - [`core`]: free functions over the process-wide default system
//!
//! ## Philosophy
//!
//! **Handles are capabilities, not addresses.**
//!
//! A handle only means something inside the system that issued it. Moving a
//! handle moves the capability; the old value stops working. Nothing blocks
//! except an explicit wait, so callers never hold a lock they did not ask for.

pub mod audit;
pub mod core;
pub mod data_pipe;
pub mod dispatcher;
pub mod handle_table;
pub mod message_pipe;
pub mod message_queue;
pub mod shared_buffer;
pub mod system;
pub mod timer;
pub mod wait;
pub mod waiter;

pub use data_pipe::{ReadLease, WriteLease};
pub use shared_buffer::BufferMapping;
pub use system::System;
pub use wait::WaitFuture;

use std::sync::OnceLock;

static DEFAULT_SYSTEM: OnceLock<System> = OnceLock::new();

/// Returns the process-wide default system
///
/// Created with default configuration on first use and never torn down.
pub fn default_system() -> &'static System {
    DEFAULT_SYSTEM.get_or_init(System::new)
}
