//! # Kernel API
//!
//! This crate defines the interface between callers and the handle kernel.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not policies:
//! - Message pipes (datagrams that can carry handles)
//! - Data pipes (flow-controlled element streams)
//! - Shared buffers (mappable regions)
//! - Signals and waits (one readiness model for all of the above)
//!
//! ## Design Goals
//!
//! 1. **Testability**: The entire API can be mocked and tested
//! 2. **Explicitness**: Every operation names its handle namespace
//! 3. **Stable ABI shapes**: Result codes and options layouts are fixed
//! 4. **Simplicity**: Minimal surface area
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A wire protocol between machines
//! - A payload framing or versioning scheme
//! - A process bootstrap mechanism

pub mod error;
pub mod flags;
pub mod kernel;
pub mod options;
pub mod time;

pub use error::{
    result_code, KernelError, KernelResult, MessageSizes, ReadMessageError, WaitError,
    WaitManyError, WaitManyResult, RESULT_OK,
};
pub use flags::{
    BufferInformationFlags, MapBufferFlags, ReadDataFlags, ReadMessageFlags, WriteDataFlags,
    WriteMessageFlags,
};
pub use kernel::KernelApi;
pub use options::{
    BufferInformation, CreateDataPipeOptions, CreateMessagePipeOptions, CreateSharedBufferOptions,
    DataPipeConsumerOptions, DataPipeProducerOptions, DuplicateBufferHandleOptions,
    VersionedOptions,
};
pub use time::{Deadline, TimeTicks};
