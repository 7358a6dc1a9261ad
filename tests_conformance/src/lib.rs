//! Conformance Test Utilities
//!
//! Shared helpers for the cross-crate tests under `tests/`.
//!
//! ## Test Philosophy
//!
//! - **Observable behavior only**: tests go through `System` and the
//!   `KernelApi` trait, never through kernel internals
//! - **Isolation**: each test builds its own systems; only the default-system
//!   tests touch process-wide state
//! - **Bounded waits**: blocking tests use deadlines or joinable threads so a
//!   regression fails instead of hanging

use core_types::Handle;
use handle_kernel::System;
use kernel_api::{KernelApi, KernelResult, ReadMessageError, ReadMessageFlags, WriteMessageFlags};
use kernel_config::{KernelConfig, KernelLimits};

/// A system with default limits and a fresh message pipe
pub fn system_with_pipe() -> KernelResult<(System, Handle, Handle)> {
    let system = System::new();
    let (h0, h1) = system.create_message_pipe(None)?;
    Ok((system, h0, h1))
}

/// A system whose handle table holds at most `max_handles`
pub fn system_with_max_handles(max_handles: usize) -> System {
    System::with_config(KernelConfig {
        limits: KernelLimits::default().with_max_handles(max_handles),
        ..KernelConfig::default()
    })
}

/// Writes `bytes` with no attached handles
pub fn send<K: KernelApi>(kernel: &K, handle: Handle, bytes: &[u8]) -> KernelResult<()> {
    kernel.write_message(handle, bytes, &[], WriteMessageFlags::empty())
}

/// Reads one message into exactly-sized buffers
pub fn receive(
    system: &System,
    handle: Handle,
) -> Result<(Vec<u8>, Vec<Handle>), ReadMessageError> {
    system.read_message_owned(handle, ReadMessageFlags::empty())
}
