//! Free functions over the default system
//!
//! Each function forwards to the same operation on
//! [`default_system`](crate::default_system). Handles returned here belong
//! to that system.

use crate::{default_system, BufferMapping, ReadLease, WaitFuture, WriteLease};
use core_types::{Handle, Signals, SignalsState};
use kernel_api::{
    BufferInformation, CreateDataPipeOptions, CreateMessagePipeOptions,
    CreateSharedBufferOptions, DataPipeConsumerOptions, DataPipeProducerOptions, Deadline,
    DuplicateBufferHandleOptions, KernelResult, MapBufferFlags, MessageSizes, ReadDataFlags,
    ReadMessageError, ReadMessageFlags, TimeTicks, WaitError, WaitManyError, WaitManyResult,
    WriteDataFlags, WriteMessageFlags,
};

pub fn time_ticks_now() -> TimeTicks {
    default_system().time_ticks_now()
}

pub fn close(handle: Handle) -> KernelResult<()> {
    default_system().close(handle)
}

pub fn wait(handle: Handle, signals: Signals, deadline: Deadline) -> Result<SignalsState, WaitError> {
    default_system().wait(handle, signals, deadline)
}

pub fn wait_many(
    handles: &[Handle],
    signals: &[Signals],
    deadline: Deadline,
) -> Result<WaitManyResult, WaitManyError> {
    default_system().wait_many(handles, signals, deadline)
}

pub fn wait_async(handle: Handle, signals: Signals) -> WaitFuture {
    default_system().wait_async(handle, signals)
}

pub fn create_message_pipe(
    options: Option<CreateMessagePipeOptions>,
) -> KernelResult<(Handle, Handle)> {
    default_system().create_message_pipe(options)
}

pub fn write_message(
    handle: Handle,
    bytes: &[u8],
    handles: &[Handle],
    flags: WriteMessageFlags,
) -> KernelResult<()> {
    default_system().write_message(handle, bytes, handles, flags)
}

pub fn read_message(
    handle: Handle,
    bytes: &mut [u8],
    handles: &mut [Handle],
    flags: ReadMessageFlags,
) -> Result<MessageSizes, ReadMessageError> {
    default_system().read_message(handle, bytes, handles, flags)
}

pub fn read_message_owned(
    handle: Handle,
    flags: ReadMessageFlags,
) -> Result<(Vec<u8>, Vec<Handle>), ReadMessageError> {
    default_system().read_message_owned(handle, flags)
}

pub fn create_data_pipe(options: Option<CreateDataPipeOptions>) -> KernelResult<(Handle, Handle)> {
    default_system().create_data_pipe(options)
}

pub fn set_data_pipe_producer_options(
    handle: Handle,
    options: Option<DataPipeProducerOptions>,
) -> KernelResult<()> {
    default_system().set_data_pipe_producer_options(handle, options)
}

pub fn get_data_pipe_producer_options(handle: Handle) -> KernelResult<DataPipeProducerOptions> {
    default_system().get_data_pipe_producer_options(handle)
}

pub fn write_data(handle: Handle, data: &[u8], flags: WriteDataFlags) -> KernelResult<usize> {
    default_system().write_data(handle, data, flags)
}

pub fn begin_write_data(handle: Handle) -> KernelResult<WriteLease> {
    default_system().begin_write_data(handle)
}

pub fn end_write_data(handle: Handle, num_bytes_written: usize) -> KernelResult<()> {
    default_system().end_write_data(handle, num_bytes_written)
}

pub fn set_data_pipe_consumer_options(
    handle: Handle,
    options: Option<DataPipeConsumerOptions>,
) -> KernelResult<()> {
    default_system().set_data_pipe_consumer_options(handle, options)
}

pub fn get_data_pipe_consumer_options(handle: Handle) -> KernelResult<DataPipeConsumerOptions> {
    default_system().get_data_pipe_consumer_options(handle)
}

pub fn read_data(handle: Handle, buffer: &mut [u8], flags: ReadDataFlags) -> KernelResult<usize> {
    default_system().read_data(handle, buffer, flags)
}

pub fn begin_read_data(handle: Handle) -> KernelResult<ReadLease> {
    default_system().begin_read_data(handle)
}

pub fn end_read_data(handle: Handle, num_bytes_read: usize) -> KernelResult<()> {
    default_system().end_read_data(handle, num_bytes_read)
}

pub fn create_shared_buffer(
    options: Option<CreateSharedBufferOptions>,
    num_bytes: u64,
) -> KernelResult<Handle> {
    default_system().create_shared_buffer(options, num_bytes)
}

pub fn duplicate_buffer_handle(
    handle: Handle,
    options: Option<DuplicateBufferHandleOptions>,
) -> KernelResult<Handle> {
    default_system().duplicate_buffer_handle(handle, options)
}

pub fn get_buffer_information(handle: Handle) -> KernelResult<BufferInformation> {
    default_system().get_buffer_information(handle)
}

pub fn map_buffer(
    handle: Handle,
    offset: u64,
    num_bytes: u64,
    flags: MapBufferFlags,
) -> KernelResult<BufferMapping> {
    default_system().map_buffer(handle, offset, num_bytes, flags)
}

pub fn unmap_buffer(mapping: BufferMapping) -> KernelResult<()> {
    default_system().unmap_buffer(mapping)
}
