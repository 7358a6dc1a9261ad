//! Systems
//!
//! A [`System`] is one handle namespace: its own handle table, its own live
//! mappings and its own audit trail. Pipes and buffers are not owned by a
//! system; their endpoints can move between systems through messages or
//! [`System::transfer_handle`].
//!
//! Locks are taken in one order: a system's handle table, then a pipe, then a
//! waiter. Dispatchers are never closed while a pipe lock is held.

use crate::audit::{HandleAuditEvent, HandleAuditLog, HandleEvent};
use crate::data_pipe::{DataPipe, ReadLease, WriteLease};
use crate::dispatcher::{close_messages, Dispatcher};
use crate::handle_table::HandleTable;
use crate::message_pipe::ReadFailure;
use crate::message_queue::Message;
use crate::shared_buffer::{BufferMapping, MappingRegistry, SharedRegion};
use crate::timer;
use crate::wait::{self, WaitFuture};
use core_types::{Handle, Signals, SignalsState, SystemId};
use kernel_api::{
    BufferInformation, CreateDataPipeOptions, CreateMessagePipeOptions,
    CreateSharedBufferOptions, DataPipeConsumerOptions, DataPipeProducerOptions, Deadline,
    DuplicateBufferHandleOptions, KernelApi, KernelError, KernelResult, MapBufferFlags,
    MessageSizes, ReadDataFlags, ReadMessageError, ReadMessageFlags, TimeTicks, VersionedOptions,
    WaitError, WaitManyError, WaitManyResult, WriteDataFlags, WriteMessageFlags,
};
use kernel_config::KernelConfig;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// One handle namespace
pub struct System {
    id: SystemId,
    config: KernelConfig,
    handles: Mutex<HandleTable>,
    mappings: Arc<MappingRegistry>,
    audit: Mutex<HandleAuditLog>,
}

impl System {
    /// Creates a system with default limits
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Creates a system with the given limits and audit settings
    pub fn with_config(config: KernelConfig) -> Self {
        let id = SystemId::new();
        debug!("creating system {:?}", id);
        Self {
            id,
            config,
            handles: Mutex::new(HandleTable::new(config.limits.max_handles)),
            mappings: MappingRegistry::new(id),
            audit: Mutex::new(HandleAuditLog::from_config(&config.audit)),
        }
    }

    /// Identity of this handle namespace
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Limits and audit settings this system was created with
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of open handles
    pub fn handle_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Number of live mappings created by this system
    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    /// Returns the retained audit events, oldest first
    pub fn audit_events(&self) -> Vec<HandleAuditEvent> {
        self.audit.lock().get_events()
    }

    /// Counts audit events matching the predicate
    pub fn count_audit_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&HandleEvent) -> bool,
    {
        self.audit.lock().count_events(predicate)
    }

    /// Checks if any audit event matches the predicate
    pub fn has_audit_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&HandleEvent) -> bool,
    {
        self.audit.lock().has_event(predicate)
    }

    pub fn clear_audit_log(&self) {
        self.audit.lock().clear();
    }

    fn record(&self, event: HandleEvent) {
        self.audit.lock().record_event(timer::time_ticks_now(), event);
    }

    /// Reads the monotonic clock in microseconds
    pub fn time_ticks_now(&self) -> TimeTicks {
        timer::time_ticks_now()
    }

    fn resolve(&self, handle: Handle) -> KernelResult<Arc<Dispatcher>> {
        self.handles.lock().get_dispatcher(handle)
    }

    fn resolve_producer(&self, handle: Handle) -> KernelResult<Arc<DataPipe>> {
        let dispatcher = self.resolve(handle)?;
        dispatcher
            .as_data_pipe_producer()
            .cloned()
            .ok_or(KernelError::InvalidArgument)
    }

    fn resolve_consumer(&self, handle: Handle) -> KernelResult<Arc<DataPipe>> {
        let dispatcher = self.resolve(handle)?;
        dispatcher
            .as_data_pipe_consumer()
            .cloned()
            .ok_or(KernelError::InvalidArgument)
    }

    fn resolve_shared_buffer(&self, handle: Handle) -> KernelResult<Arc<SharedRegion>> {
        let dispatcher = self.resolve(handle)?;
        dispatcher
            .as_shared_buffer()
            .cloned()
            .ok_or(KernelError::InvalidArgument)
    }

    /// Current signals state of `handle` without waiting
    pub fn signals_state(&self, handle: Handle) -> KernelResult<SignalsState> {
        Ok(self.resolve(handle)?.signals_state())
    }

    /// Closes a handle
    ///
    /// Peers of the closed end observe `PEER_CLOSED`; pending waits on this
    /// handle end with `FailedPrecondition`.
    pub fn close(&self, handle: Handle) -> KernelResult<()> {
        let dispatcher = self.handles.lock().remove(handle)?;
        let kind = dispatcher.kind();
        dispatcher.close();
        debug!("closed {} {:?}", kind, handle);
        self.record(HandleEvent::Closed { handle, kind });
        Ok(())
    }

    /// Moves `handle` out of this system and into `to`
    ///
    /// Returns the handle's value in `to`. If `to` has no room the handle is
    /// closed and `ResourceExhausted` is returned; it does not come back.
    pub fn transfer_handle(&self, handle: Handle, to: &System) -> KernelResult<Handle> {
        let dispatcher = {
            let mut table = self.handles.lock();
            // Two-phase operations start under this lock too
            if table.get_dispatcher(handle)?.in_two_phase() {
                return Err(KernelError::Busy);
            }
            table.remove(handle)?
        };
        dispatcher.cancel_waiters();
        self.record(HandleEvent::TransferredOut { handle, to: to.id });

        let added = to.handles.lock().add(Arc::clone(&dispatcher));
        match added {
            Ok(new_handle) => {
                debug!(
                    "transferred {} {:?} to {:?} as {:?}",
                    dispatcher.kind(),
                    handle,
                    to.id,
                    new_handle
                );
                to.record(HandleEvent::TransferredIn {
                    handle: new_handle,
                    from: self.id,
                });
                Ok(new_handle)
            }
            Err(error) => {
                warn!(
                    "handle table of {:?} is full; closing transferred {} {:?}",
                    to.id,
                    dispatcher.kind(),
                    handle
                );
                dispatcher.close();
                self.record(HandleEvent::TransferLost { handle, to: to.id });
                Err(error)
            }
        }
    }

    /// Blocks until any of `signals` is satisfied on `handle`
    pub fn wait(
        &self,
        handle: Handle,
        signals: Signals,
        deadline: Deadline,
    ) -> Result<SignalsState, WaitError> {
        let dispatcher = self.resolve(handle)?;
        wait::wait_one(&dispatcher, signals, deadline)
    }

    /// Blocks until any handle has any of its requested signals satisfied
    pub fn wait_many(
        &self,
        handles: &[Handle],
        signals: &[Signals],
        deadline: Deadline,
    ) -> Result<WaitManyResult, WaitManyError> {
        if handles.is_empty() || handles.len() != signals.len() {
            return Err(WaitManyError::new(KernelError::InvalidArgument));
        }
        let dispatchers = {
            let table = self.handles.lock();
            handles
                .iter()
                .enumerate()
                .map(|(index, handle)| {
                    table
                        .get_dispatcher(*handle)
                        .map_err(|error| WaitManyError::at_index(error, index))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        wait::wait_many(&dispatchers, signals, deadline)
    }

    /// Returns a future that resolves once `signals` is satisfied on `handle`
    pub fn wait_async(&self, handle: Handle, signals: Signals) -> WaitFuture {
        match self.resolve(handle) {
            Ok(dispatcher) => WaitFuture::new(dispatcher, signals),
            Err(error) => WaitFuture::failed(error),
        }
    }

    fn add_pair(&self, first: Dispatcher, second: Dispatcher) -> KernelResult<(Handle, Handle)> {
        let kinds = (first.kind(), second.kind());
        let (h0, h1) = self
            .handles
            .lock()
            .add_pair(Arc::new(first), Arc::new(second))?;
        debug!("created {} {:?} and {} {:?}", kinds.0, h0, kinds.1, h1);
        self.record(HandleEvent::Created {
            handle: h0,
            kind: kinds.0,
        });
        self.record(HandleEvent::Created {
            handle: h1,
            kind: kinds.1,
        });
        Ok((h0, h1))
    }

    /// Creates a message pipe and returns both endpoints
    pub fn create_message_pipe(
        &self,
        options: Option<CreateMessagePipeOptions>,
    ) -> KernelResult<(Handle, Handle)> {
        let options = options.unwrap_or_default().normalized()?;
        if options.flags != 0 {
            return Err(KernelError::Unimplemented);
        }
        let (first, second) =
            Dispatcher::message_pipe_pair(self.config.limits.max_queued_messages);
        self.add_pair(first, second)
    }

    /// Queues a message on the peer of `handle`
    ///
    /// Attached handles leave this system when the write succeeds and stay
    /// where they are when it fails.
    pub fn write_message(
        &self,
        handle: Handle,
        bytes: &[u8],
        handles: &[Handle],
        flags: WriteMessageFlags,
    ) -> KernelResult<()> {
        if !flags.is_empty() {
            return Err(KernelError::Unimplemented);
        }
        let limits = &self.config.limits;

        let (endpoint, attached) = {
            let mut table = self.handles.lock();
            let dispatcher = table.get_dispatcher(handle)?;
            let endpoint = dispatcher
                .as_message_pipe_endpoint()
                .cloned()
                .ok_or(KernelError::InvalidArgument)?;
            if bytes.len() > limits.max_message_num_bytes
                || handles.len() > limits.max_message_num_handles
            {
                return Err(KernelError::ResourceExhausted);
            }

            // Validate every attachment before touching any of them
            let mut seen = HashSet::with_capacity(handles.len());
            for attached in handles {
                if *attached == handle || !seen.insert(*attached) {
                    return Err(KernelError::InvalidArgument);
                }
                if table.get_dispatcher(*attached)?.in_two_phase() {
                    return Err(KernelError::Busy);
                }
            }
            let attached = handles
                .iter()
                .map(|attached| table.mark_busy(*attached))
                .collect::<KernelResult<Vec<_>>>()?;
            (endpoint, attached)
        };

        // Waits made through the attached handles end now
        for dispatcher in &attached {
            dispatcher.cancel_waiters();
        }

        let result = endpoint
            .pipe
            .write_message(endpoint.port, Message::new(bytes.to_vec(), attached));

        let mut table = self.handles.lock();
        match result {
            Ok(()) => {
                for attached in handles {
                    table.remove_busy(*attached);
                }
                drop(table);
                for attached in handles {
                    self.record(HandleEvent::SentInMessage {
                        handle: *attached,
                        via: handle,
                    });
                }
                Ok(())
            }
            Err((error, message)) => {
                for attached in handles {
                    table.restore(*attached);
                }
                drop(table);
                // The table still holds every dispatcher the message carried
                drop(message);
                Err(error)
            }
        }
    }

    /// Dequeues the next message into the supplied buffers
    pub fn read_message(
        &self,
        handle: Handle,
        bytes: &mut [u8],
        handles: &mut [Handle],
        flags: ReadMessageFlags,
    ) -> Result<MessageSizes, ReadMessageError> {
        let (payload, received) = self.dequeue_message(handle, bytes.len(), handles.len(), flags)?;
        bytes[..payload.len()].copy_from_slice(&payload);
        handles[..received.len()].copy_from_slice(&received);
        Ok(MessageSizes {
            num_bytes: payload.len(),
            num_handles: received.len(),
        })
    }

    /// Dequeues the next message into freshly allocated buffers
    pub fn read_message_owned(
        &self,
        handle: Handle,
        flags: ReadMessageFlags,
    ) -> Result<(Vec<u8>, Vec<Handle>), ReadMessageError> {
        self.dequeue_message(handle, usize::MAX, usize::MAX, flags)
    }

    fn dequeue_message(
        &self,
        handle: Handle,
        max_bytes: usize,
        max_handles: usize,
        flags: ReadMessageFlags,
    ) -> Result<(Vec<u8>, Vec<Handle>), ReadMessageError> {
        let may_discard = flags.contains(ReadMessageFlags::MAY_DISCARD);
        if !(flags - ReadMessageFlags::MAY_DISCARD).is_empty() {
            return Err(KernelError::Unimplemented.into());
        }

        let mut table = self.handles.lock();
        let dispatcher = table.get_dispatcher(handle)?;
        let endpoint = dispatcher
            .as_message_pipe_endpoint()
            .ok_or(KernelError::InvalidArgument)?;

        let room = table.remaining_capacity();
        let message = match endpoint
            .pipe
            .read_message(endpoint.port, max_bytes, max_handles, room, may_discard)
        {
            Ok(message) => message,
            Err(ReadFailure { error, discarded }) => {
                drop(table);
                if let Some(message) = discarded {
                    debug!(
                        "discarded message of {} bytes on {:?}",
                        message.bytes.len(),
                        handle
                    );
                    close_messages(vec![message]);
                }
                return Err(error);
            }
        };

        let received = match table.add_many(&message.dispatchers) {
            Ok(received) => received,
            Err(error) => {
                endpoint.pipe.requeue_front(endpoint.port, message);
                return Err(error.into());
            }
        };
        drop(table);

        for new_handle in &received {
            self.record(HandleEvent::ReceivedFromMessage {
                handle: *new_handle,
                via: handle,
            });
        }
        Ok((message.bytes, received))
    }

    /// Creates a data pipe and returns `(producer, consumer)`
    pub fn create_data_pipe(
        &self,
        options: Option<CreateDataPipeOptions>,
    ) -> KernelResult<(Handle, Handle)> {
        let options = options.unwrap_or_default().normalized()?;
        if options.flags != 0 {
            return Err(KernelError::Unimplemented);
        }
        let limits = &self.config.limits;

        let element = options.element_num_bytes as usize;
        if element == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let capacity = match options.capacity_num_bytes as usize {
            0 => {
                let default = limits.default_data_pipe_capacity_num_bytes as usize;
                (default - default % element).max(element)
            }
            capacity if capacity % element != 0 => return Err(KernelError::InvalidArgument),
            capacity => capacity,
        };
        if capacity > limits.max_data_pipe_capacity_num_bytes as usize {
            return Err(KernelError::ResourceExhausted);
        }

        let (producer, consumer) = Dispatcher::data_pipe_pair(element, capacity);
        self.add_pair(producer, consumer)
    }

    /// Sets the producer's write threshold; `None` resets it
    pub fn set_data_pipe_producer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeProducerOptions>,
    ) -> KernelResult<()> {
        let pipe = self.resolve_producer(handle)?;
        let threshold = match options {
            Some(options) => options.normalized()?.write_threshold_num_bytes as usize,
            None => 0,
        };
        pipe.set_write_threshold(threshold)
    }

    pub fn get_data_pipe_producer_options(
        &self,
        handle: Handle,
    ) -> KernelResult<DataPipeProducerOptions> {
        Ok(self.resolve_producer(handle)?.producer_options())
    }

    /// Copies data into the pipe and returns the number of bytes written
    pub fn write_data(
        &self,
        handle: Handle,
        data: &[u8],
        flags: WriteDataFlags,
    ) -> KernelResult<usize> {
        self.resolve_producer(handle)?.write_data(data, flags)
    }

    /// Reserves the largest contiguous free region for in-place writing
    ///
    /// The handle stays locked in the table until the reservation is made, so
    /// a concurrent transfer or `write_message` either sees the two-phase
    /// write or removes the handle first.
    pub fn begin_write_data(&self, handle: Handle) -> KernelResult<WriteLease> {
        let table = self.handles.lock();
        let dispatcher = table.get_dispatcher(handle)?;
        let pipe = dispatcher
            .as_data_pipe_producer()
            .ok_or(KernelError::InvalidArgument)?;
        pipe.begin_write_data()
    }

    /// Commits `num_bytes_written` bytes of the reserved region
    pub fn end_write_data(&self, handle: Handle, num_bytes_written: usize) -> KernelResult<()> {
        self.resolve_producer(handle)?
            .end_write_data(num_bytes_written)
    }

    /// Sets the consumer's read threshold; `None` resets it
    pub fn set_data_pipe_consumer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeConsumerOptions>,
    ) -> KernelResult<()> {
        let pipe = self.resolve_consumer(handle)?;
        let threshold = match options {
            Some(options) => options.normalized()?.read_threshold_num_bytes as usize,
            None => 0,
        };
        pipe.set_read_threshold(threshold)
    }

    pub fn get_data_pipe_consumer_options(
        &self,
        handle: Handle,
    ) -> KernelResult<DataPipeConsumerOptions> {
        Ok(self.resolve_consumer(handle)?.consumer_options())
    }

    /// Reads, discards, peeks or queries data according to `flags`
    pub fn read_data(
        &self,
        handle: Handle,
        buffer: &mut [u8],
        flags: ReadDataFlags,
    ) -> KernelResult<usize> {
        self.resolve_consumer(handle)?.read_data(buffer, flags)
    }

    /// Exposes the largest contiguous readable region in place
    pub fn begin_read_data(&self, handle: Handle) -> KernelResult<ReadLease> {
        let table = self.handles.lock();
        let dispatcher = table.get_dispatcher(handle)?;
        let pipe = dispatcher
            .as_data_pipe_consumer()
            .ok_or(KernelError::InvalidArgument)?;
        pipe.begin_read_data()
    }

    /// Consumes `num_bytes_read` bytes of the exposed region
    pub fn end_read_data(&self, handle: Handle, num_bytes_read: usize) -> KernelResult<()> {
        self.resolve_consumer(handle)?.end_read_data(num_bytes_read)
    }

    /// Creates a zero-filled shared buffer of `num_bytes`
    pub fn create_shared_buffer(
        &self,
        options: Option<CreateSharedBufferOptions>,
        num_bytes: u64,
    ) -> KernelResult<Handle> {
        let options = options.unwrap_or_default().normalized()?;
        if options.flags != 0 {
            return Err(KernelError::Unimplemented);
        }
        if num_bytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        if num_bytes > self.config.limits.max_shared_buffer_num_bytes {
            return Err(KernelError::ResourceExhausted);
        }
        let num_bytes = usize::try_from(num_bytes).map_err(|_| KernelError::ResourceExhausted)?;

        let dispatcher = Dispatcher::SharedBuffer(SharedRegion::new(num_bytes));
        let kind = dispatcher.kind();
        let handle = self.handles.lock().add(Arc::new(dispatcher))?;
        debug!("created {} {:?} of {} bytes", kind, handle, num_bytes);
        self.record(HandleEvent::Created { handle, kind });
        Ok(handle)
    }

    /// Returns a second handle to the same shared region
    pub fn duplicate_buffer_handle(
        &self,
        handle: Handle,
        options: Option<DuplicateBufferHandleOptions>,
    ) -> KernelResult<Handle> {
        let region = self.resolve_shared_buffer(handle)?;
        let options = options.unwrap_or_default().normalized()?;
        if options.flags != 0 {
            return Err(KernelError::Unimplemented);
        }
        let duplicate = self
            .handles
            .lock()
            .add(Arc::new(Dispatcher::SharedBuffer(region)))?;
        self.record(HandleEvent::Duplicated {
            source: handle,
            handle: duplicate,
        });
        Ok(duplicate)
    }

    /// Describes the shared region behind `handle`
    pub fn get_buffer_information(&self, handle: Handle) -> KernelResult<BufferInformation> {
        let region = self.resolve_shared_buffer(handle)?;
        Ok(BufferInformation::new(region.len() as u64))
    }

    /// Maps `num_bytes` of the region starting at `offset`
    ///
    /// The mapping stays valid after every handle to the buffer is closed.
    pub fn map_buffer(
        &self,
        handle: Handle,
        offset: u64,
        num_bytes: u64,
        flags: MapBufferFlags,
    ) -> KernelResult<BufferMapping> {
        if !flags.is_empty() {
            return Err(KernelError::Unimplemented);
        }
        let region = self.resolve_shared_buffer(handle)?;
        let (start, len) = region.check_range(offset, num_bytes)?;
        let mapping = self.mappings.map(region, start, len);
        self.record(HandleEvent::Mapped {
            handle,
            offset,
            num_bytes,
        });
        Ok(mapping)
    }

    /// Releases a mapping created by this system
    ///
    /// A mapping that belongs to another system is rejected; it is released
    /// anyway when dropped.
    pub fn unmap_buffer(&self, mapping: BufferMapping) -> KernelResult<()> {
        if !self.mappings.owns(&mapping) {
            return Err(KernelError::InvalidArgument);
        }
        let num_bytes = mapping.len() as u64;
        drop(mapping);
        self.record(HandleEvent::Unmapped { num_bytes });
        Ok(())
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for System {
    fn drop(&mut self) {
        let entries = self.handles.get_mut().drain();
        if !entries.is_empty() {
            debug!("closing {} handles of {:?}", entries.len(), self.id);
        }
        for (_, dispatcher) in entries {
            dispatcher.close();
        }
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("handles", &self.handle_count())
            .field("mappings", &self.mapping_count())
            .finish()
    }
}

impl KernelApi for System {
    type Mapping = BufferMapping;
    type WriteLease = WriteLease;
    type ReadLease = ReadLease;

    fn close(&self, handle: Handle) -> KernelResult<()> {
        System::close(self, handle)
    }

    fn wait(
        &self,
        handle: Handle,
        signals: Signals,
        deadline: Deadline,
    ) -> Result<SignalsState, WaitError> {
        System::wait(self, handle, signals, deadline)
    }

    fn wait_many(
        &self,
        handles: &[Handle],
        signals: &[Signals],
        deadline: Deadline,
    ) -> Result<WaitManyResult, WaitManyError> {
        System::wait_many(self, handles, signals, deadline)
    }

    fn create_message_pipe(
        &self,
        options: Option<CreateMessagePipeOptions>,
    ) -> KernelResult<(Handle, Handle)> {
        System::create_message_pipe(self, options)
    }

    fn write_message(
        &self,
        handle: Handle,
        bytes: &[u8],
        handles: &[Handle],
        flags: WriteMessageFlags,
    ) -> KernelResult<()> {
        System::write_message(self, handle, bytes, handles, flags)
    }

    fn read_message(
        &self,
        handle: Handle,
        bytes: &mut [u8],
        handles: &mut [Handle],
        flags: ReadMessageFlags,
    ) -> Result<MessageSizes, ReadMessageError> {
        System::read_message(self, handle, bytes, handles, flags)
    }

    fn create_data_pipe(
        &self,
        options: Option<CreateDataPipeOptions>,
    ) -> KernelResult<(Handle, Handle)> {
        System::create_data_pipe(self, options)
    }

    fn set_data_pipe_producer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeProducerOptions>,
    ) -> KernelResult<()> {
        System::set_data_pipe_producer_options(self, handle, options)
    }

    fn get_data_pipe_producer_options(
        &self,
        handle: Handle,
    ) -> KernelResult<DataPipeProducerOptions> {
        System::get_data_pipe_producer_options(self, handle)
    }

    fn write_data(&self, handle: Handle, data: &[u8], flags: WriteDataFlags) -> KernelResult<usize> {
        System::write_data(self, handle, data, flags)
    }

    fn begin_write_data(&self, handle: Handle) -> KernelResult<WriteLease> {
        System::begin_write_data(self, handle)
    }

    fn end_write_data(&self, handle: Handle, num_bytes_written: usize) -> KernelResult<()> {
        System::end_write_data(self, handle, num_bytes_written)
    }

    fn set_data_pipe_consumer_options(
        &self,
        handle: Handle,
        options: Option<DataPipeConsumerOptions>,
    ) -> KernelResult<()> {
        System::set_data_pipe_consumer_options(self, handle, options)
    }

    fn get_data_pipe_consumer_options(
        &self,
        handle: Handle,
    ) -> KernelResult<DataPipeConsumerOptions> {
        System::get_data_pipe_consumer_options(self, handle)
    }

    fn read_data(&self, handle: Handle, buffer: &mut [u8], flags: ReadDataFlags) -> KernelResult<usize> {
        System::read_data(self, handle, buffer, flags)
    }

    fn begin_read_data(&self, handle: Handle) -> KernelResult<ReadLease> {
        System::begin_read_data(self, handle)
    }

    fn end_read_data(&self, handle: Handle, num_bytes_read: usize) -> KernelResult<()> {
        System::end_read_data(self, handle, num_bytes_read)
    }

    fn create_shared_buffer(
        &self,
        options: Option<CreateSharedBufferOptions>,
        num_bytes: u64,
    ) -> KernelResult<Handle> {
        System::create_shared_buffer(self, options, num_bytes)
    }

    fn duplicate_buffer_handle(
        &self,
        handle: Handle,
        options: Option<DuplicateBufferHandleOptions>,
    ) -> KernelResult<Handle> {
        System::duplicate_buffer_handle(self, handle, options)
    }

    fn get_buffer_information(&self, handle: Handle) -> KernelResult<BufferInformation> {
        System::get_buffer_information(self, handle)
    }

    fn map_buffer(
        &self,
        handle: Handle,
        offset: u64,
        num_bytes: u64,
        flags: MapBufferFlags,
    ) -> KernelResult<BufferMapping> {
        System::map_buffer(self, handle, offset, num_bytes, flags)
    }

    fn unmap_buffer(&self, mapping: BufferMapping) -> KernelResult<()> {
        System::unmap_buffer(self, mapping)
    }

    fn time_ticks_now(&self) -> TimeTicks {
        System::time_ticks_now(self)
    }
}
