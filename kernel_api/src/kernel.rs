//! Kernel API trait

use crate::error::{
    KernelResult, MessageSizes, ReadMessageError, WaitError, WaitManyError, WaitManyResult,
};
use crate::flags::{MapBufferFlags, ReadDataFlags, ReadMessageFlags, WriteDataFlags, WriteMessageFlags};
use crate::options::{
    BufferInformation, CreateDataPipeOptions, CreateMessagePipeOptions, CreateSharedBufferOptions,
    DataPipeConsumerOptions, DataPipeProducerOptions, DuplicateBufferHandleOptions,
};
use crate::time::{Deadline, TimeTicks};
use core_types::{Handle, Signals, SignalsState};

/// The kernel API trait
///
/// Every operation is scoped to one handle namespace (the implementor). The
/// same handle value means nothing in another namespace; moving a handle
/// between namespaces is done by the implementation, outside this trait.
///
/// Only the wait operations block. Everything else returns
/// [`KernelError::ShouldWait`](crate::KernelError::ShouldWait) when it cannot
/// make progress, and the caller waits for the matching signal.
///
/// # Example
///
/// ```ignore
/// use core_types::Signals;
/// use kernel_api::{Deadline, KernelApi, WriteMessageFlags};
///
/// fn ping<K: KernelApi>(kernel: &K) -> Result<(), kernel_api::KernelError> {
///     let (a, b) = kernel.create_message_pipe(None)?;
///     kernel.write_message(a, b"ping", &[], WriteMessageFlags::empty())?;
///     kernel
///         .wait(b, Signals::READABLE, Deadline::INDEFINITE)
///         .map_err(|e| e.error)?;
///     kernel.close(a)?;
///     kernel.close(b)
/// }
/// ```
pub trait KernelApi {
    /// Lease on a mapped shared-buffer range
    type Mapping;
    /// Lease on a reserved producer region during two-phase write
    type WriteLease;
    /// Lease on a readable consumer region during two-phase read
    type ReadLease;

    /// Closes a handle and releases its dispatcher
    fn close(&self, handle: Handle) -> KernelResult<()>;

    /// Blocks until any of `signals` is satisfied on `handle`
    fn wait(
        &self,
        handle: Handle,
        signals: Signals,
        deadline: Deadline,
    ) -> Result<SignalsState, WaitError>;

    /// Blocks until any handle has any of its requested signals satisfied
    fn wait_many(
        &self,
        handles: &[Handle],
        signals: &[Signals],
        deadline: Deadline,
    ) -> Result<WaitManyResult, WaitManyError>;

    /// Creates a message pipe and returns both endpoints
    fn create_message_pipe(
        &self,
        options: Option<CreateMessagePipeOptions>,
    ) -> KernelResult<(Handle, Handle)>;

    /// Queues a message, moving `handles` to the peer endpoint
    fn write_message(
        &self,
        handle: Handle,
        bytes: &[u8],
        handles: &[Handle],
        flags: WriteMessageFlags,
    ) -> KernelResult<()>;

    /// Dequeues the next message into the supplied buffers
    fn read_message(
        &self,
        handle: Handle,
        bytes: &mut [u8],
        handles: &mut [Handle],
        flags: ReadMessageFlags,
    ) -> Result<MessageSizes, ReadMessageError>;

    /// Creates a data pipe and returns `(producer, consumer)`
    fn create_data_pipe(
        &self,
        options: Option<CreateDataPipeOptions>,
    ) -> KernelResult<(Handle, Handle)>;

    /// Sets the producer's write threshold; `None` resets it
    fn set_data_pipe_producer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeProducerOptions>,
    ) -> KernelResult<()>;

    /// Returns the producer's current options
    fn get_data_pipe_producer_options(&self, handle: Handle)
        -> KernelResult<DataPipeProducerOptions>;

    /// Copies data into the pipe and returns the number of bytes written
    fn write_data(&self, handle: Handle, data: &[u8], flags: WriteDataFlags)
        -> KernelResult<usize>;

    /// Reserves the largest contiguous free region for in-place writing
    fn begin_write_data(&self, handle: Handle) -> KernelResult<Self::WriteLease>;

    /// Commits `num_bytes_written` bytes of the reserved region
    fn end_write_data(&self, handle: Handle, num_bytes_written: usize) -> KernelResult<()>;

    /// Sets the consumer's read threshold; `None` resets it
    fn set_data_pipe_consumer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeConsumerOptions>,
    ) -> KernelResult<()>;

    /// Returns the consumer's current options
    fn get_data_pipe_consumer_options(&self, handle: Handle)
        -> KernelResult<DataPipeConsumerOptions>;

    /// Reads, discards, peeks or queries data according to `flags`
    fn read_data(&self, handle: Handle, buffer: &mut [u8], flags: ReadDataFlags)
        -> KernelResult<usize>;

    /// Exposes the largest contiguous readable region in place
    fn begin_read_data(&self, handle: Handle) -> KernelResult<Self::ReadLease>;

    /// Consumes `num_bytes_read` bytes of the exposed region
    fn end_read_data(&self, handle: Handle, num_bytes_read: usize) -> KernelResult<()>;

    /// Creates a shared buffer of `num_bytes`
    fn create_shared_buffer(
        &self,
        options: Option<CreateSharedBufferOptions>,
        num_bytes: u64,
    ) -> KernelResult<Handle>;

    /// Returns a second handle to the same shared region
    fn duplicate_buffer_handle(
        &self,
        handle: Handle,
        options: Option<DuplicateBufferHandleOptions>,
    ) -> KernelResult<Handle>;

    /// Describes the shared region behind `handle`
    fn get_buffer_information(&self, handle: Handle) -> KernelResult<BufferInformation>;

    /// Maps `num_bytes` of the region starting at `offset`
    fn map_buffer(
        &self,
        handle: Handle,
        offset: u64,
        num_bytes: u64,
        flags: MapBufferFlags,
    ) -> KernelResult<Self::Mapping>;

    /// Releases a mapping
    fn unmap_buffer(&self, mapping: Self::Mapping) -> KernelResult<()>;

    /// Reads the monotonic clock
    fn time_ticks_now(&self) -> TimeTicks;
}
