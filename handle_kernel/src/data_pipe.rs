//! # Data Pipes
//!
//! A data pipe moves a stream of fixed-size elements from one producer to one
//! consumer through a ring buffer.
//!
//! ## Philosophy
//!
//! - **Flow control through signals**: a full pipe says `ShouldWait`, it never blocks
//! - **Whole elements only**: every transfer is a multiple of the element size
//! - **Two-phase I/O is in place**: a lease exposes the ring itself, not a copy
//!
//! ## Accounting
//!
//! `available` counts committed, unread bytes. Free space is
//! `capacity - available`, less whatever a two-phase write has reserved. A
//! two-phase read exposes a prefix of the committed bytes without consuming
//! them until it ends. Two-phase write and two-phase read touch disjoint
//! regions, so both may be in flight at once.
//!
//! ## Leases
//!
//! [`WriteLease`] and [`ReadLease`] carry the epoch of the two-phase operation
//! that created them. Ending the operation (or closing that side) bumps the
//! epoch, and any later use of the lease fails with `FailedPrecondition`.
//! Lease closures run with the pipe lock held and must not call back into the
//! kernel for the same pipe.

use crate::waiter::{self, Registration, WakeReason, Waiter, WaiterId, WaiterSet};
use core_types::{Signals, SignalsState};
use kernel_api::{
    DataPipeConsumerOptions, DataPipeProducerOptions, KernelError, KernelResult, ReadDataFlags,
    WriteDataFlags,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Which end of a data pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Producer,
    Consumer,
}

#[derive(Debug)]
struct DataPipeState {
    buffer: Box<[u8]>,
    /// Offset of the first unread byte
    start: usize,
    /// Committed, unread bytes
    available: usize,
    producer_open: bool,
    consumer_open: bool,
    write_threshold: usize,
    read_threshold: usize,
    /// Bytes reserved by an active two-phase write
    two_phase_write: Option<usize>,
    /// Bytes exposed by an active two-phase read
    two_phase_read: Option<usize>,
    write_epoch: u64,
    read_epoch: u64,
    producer_waiters: WaiterSet,
    consumer_waiters: WaiterSet,
}

impl DataPipeState {
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn write_offset(&self) -> usize {
        (self.start + self.available) % self.capacity()
    }

    fn free_space(&self) -> usize {
        self.capacity() - self.available - self.two_phase_write.unwrap_or(0)
    }

    fn producer_state(&self, element_num_bytes: usize) -> SignalsState {
        if !self.producer_open {
            return SignalsState::none();
        }
        if !self.consumer_open {
            return SignalsState::new(Signals::PEER_CLOSED, Signals::PEER_CLOSED);
        }
        let satisfiable = Signals::WRITABLE | Signals::PEER_CLOSED | Signals::WRITE_THRESHOLD;
        let mut satisfied = Signals::NONE;
        if self.two_phase_write.is_none() {
            let free = self.free_space();
            if free > 0 {
                satisfied |= Signals::WRITABLE;
            }
            if free >= effective_threshold(self.write_threshold, element_num_bytes) {
                satisfied |= Signals::WRITE_THRESHOLD;
            }
        }
        SignalsState::new(satisfied, satisfiable)
    }

    fn consumer_state(&self, element_num_bytes: usize) -> SignalsState {
        if !self.consumer_open {
            return SignalsState::none();
        }
        let mut satisfied = Signals::NONE;
        let mut satisfiable = Signals::PEER_CLOSED;
        let threshold = effective_threshold(self.read_threshold, element_num_bytes);
        if self.producer_open {
            satisfiable |= Signals::READABLE | Signals::READ_THRESHOLD;
        } else {
            satisfied |= Signals::PEER_CLOSED;
            // Nothing more can arrive; only what is buffered counts
            if self.available > 0 {
                satisfiable |= Signals::READABLE;
            }
            if self.available >= threshold {
                satisfiable |= Signals::READ_THRESHOLD;
            }
        }
        if self.two_phase_read.is_none() && self.available > 0 {
            satisfied |= Signals::READABLE;
            if self.available >= threshold {
                satisfied |= Signals::READ_THRESHOLD;
            }
        }
        SignalsState::new(satisfied, satisfiable)
    }

    fn copy_in(&mut self, data: &[u8]) {
        let capacity = self.capacity();
        let offset = self.write_offset();
        let first = data.len().min(capacity - offset);
        self.buffer[offset..offset + first].copy_from_slice(&data[..first]);
        self.buffer[..data.len() - first].copy_from_slice(&data[first..]);
    }

    fn copy_out(&self, out: &mut [u8]) {
        let capacity = self.capacity();
        let first = out.len().min(capacity - self.start);
        out[..first].copy_from_slice(&self.buffer[self.start..self.start + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.buffer[..rest]);
    }

    fn consume(&mut self, num_bytes: usize) {
        self.start = (self.start + num_bytes) % self.capacity();
        self.available -= num_bytes;
    }
}

/// Threshold in bytes; zero stands for one element
fn effective_threshold(threshold: usize, element_num_bytes: usize) -> usize {
    if threshold == 0 {
        element_num_bytes
    } else {
        threshold
    }
}

/// Shared state of a producer/consumer pair
#[derive(Debug)]
pub struct DataPipe {
    element_num_bytes: usize,
    state: Mutex<DataPipeState>,
}

impl DataPipe {
    /// Creates a pipe; `capacity_num_bytes` must already be a validated
    /// non-zero multiple of `element_num_bytes`
    pub fn new(element_num_bytes: usize, capacity_num_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            element_num_bytes,
            state: Mutex::new(DataPipeState {
                buffer: vec![0; capacity_num_bytes].into_boxed_slice(),
                start: 0,
                available: 0,
                producer_open: true,
                consumer_open: true,
                write_threshold: 0,
                read_threshold: 0,
                two_phase_write: None,
                two_phase_read: None,
                write_epoch: 0,
                read_epoch: 0,
                producer_waiters: WaiterSet::new(),
                consumer_waiters: WaiterSet::new(),
            }),
        })
    }

    pub fn element_num_bytes(&self) -> usize {
        self.element_num_bytes
    }

    pub fn capacity_num_bytes(&self) -> usize {
        self.state.lock().capacity()
    }

    pub fn signals_state(&self, side: Side) -> SignalsState {
        let state = self.state.lock();
        self.side_state(&state, side)
    }

    fn side_state(&self, state: &DataPipeState, side: Side) -> SignalsState {
        match side {
            Side::Producer => state.producer_state(self.element_num_bytes),
            Side::Consumer => state.consumer_state(self.element_num_bytes),
        }
    }

    fn notify_both(&self, state: &mut DataPipeState) {
        let producer = state.producer_state(self.element_num_bytes);
        state.producer_waiters.notify(producer);
        let consumer = state.consumer_state(self.element_num_bytes);
        state.consumer_waiters.notify(consumer);
    }

    fn is_multiple(&self, num_bytes: usize) -> bool {
        num_bytes % self.element_num_bytes == 0
    }

    pub fn is_open(&self, side: Side) -> bool {
        let state = self.state.lock();
        match side {
            Side::Producer => state.producer_open,
            Side::Consumer => state.consumer_open,
        }
    }

    /// Returns true while `side` has a two-phase operation in flight
    pub fn in_two_phase(&self, side: Side) -> bool {
        let state = self.state.lock();
        match side {
            Side::Producer => state.two_phase_write.is_some(),
            Side::Consumer => state.two_phase_read.is_some(),
        }
    }

    pub fn producer_options(&self) -> DataPipeProducerOptions {
        let threshold = self.state.lock().write_threshold;
        DataPipeProducerOptions::with_threshold(threshold as u32)
    }

    pub fn consumer_options(&self) -> DataPipeConsumerOptions {
        let threshold = self.state.lock().read_threshold;
        DataPipeConsumerOptions::with_threshold(threshold as u32)
    }

    fn validate_threshold(&self, capacity: usize, threshold: usize) -> KernelResult<()> {
        if threshold > capacity || !self.is_multiple(threshold) {
            return Err(KernelError::InvalidArgument);
        }
        Ok(())
    }

    pub fn set_write_threshold(&self, threshold: usize) -> KernelResult<()> {
        let mut state = self.state.lock();
        if !state.producer_open {
            return Err(KernelError::InvalidArgument);
        }
        self.validate_threshold(state.capacity(), threshold)?;
        state.write_threshold = threshold;
        self.notify_both(&mut state);
        Ok(())
    }

    pub fn set_read_threshold(&self, threshold: usize) -> KernelResult<()> {
        let mut state = self.state.lock();
        if !state.consumer_open {
            return Err(KernelError::InvalidArgument);
        }
        self.validate_threshold(state.capacity(), threshold)?;
        state.read_threshold = threshold;
        self.notify_both(&mut state);
        Ok(())
    }

    /// Copies as much of `data` as fits and returns the bytes written
    pub fn write_data(&self, data: &[u8], flags: WriteDataFlags) -> KernelResult<usize> {
        if !self.is_multiple(data.len()) {
            return Err(KernelError::InvalidArgument);
        }
        let mut state = self.state.lock();
        if !state.producer_open {
            return Err(KernelError::InvalidArgument);
        }
        if state.two_phase_write.is_some() {
            return Err(KernelError::Busy);
        }
        if !state.consumer_open {
            return Err(KernelError::FailedPrecondition);
        }
        if data.is_empty() {
            return Ok(0);
        }

        let free = state.free_space();
        if flags.contains(WriteDataFlags::ALL_OR_NONE) && data.len() > free {
            return Err(KernelError::OutOfRange);
        }
        if free == 0 {
            return Err(KernelError::ShouldWait);
        }

        let num_bytes = data.len().min(free);
        state.copy_in(&data[..num_bytes]);
        state.available += num_bytes;
        self.notify_both(&mut state);
        Ok(num_bytes)
    }

    /// Reads, discards, peeks or queries according to `flags`
    pub fn read_data(&self, buffer: &mut [u8], flags: ReadDataFlags) -> KernelResult<usize> {
        if flags.is_conflicting() {
            return Err(KernelError::InvalidArgument);
        }
        let mut state = self.state.lock();
        if !state.consumer_open {
            return Err(KernelError::InvalidArgument);
        }
        if state.two_phase_read.is_some() {
            return Err(KernelError::Busy);
        }
        if flags.contains(ReadDataFlags::QUERY) {
            return Ok(state.available);
        }
        if !self.is_multiple(buffer.len()) {
            return Err(KernelError::InvalidArgument);
        }
        if state.available == 0 {
            return Err(if state.producer_open {
                KernelError::ShouldWait
            } else {
                KernelError::FailedPrecondition
            });
        }
        if buffer.is_empty() {
            return Ok(0);
        }
        if flags.contains(ReadDataFlags::ALL_OR_NONE) && buffer.len() > state.available {
            return Err(if state.producer_open {
                KernelError::OutOfRange
            } else {
                KernelError::FailedPrecondition
            });
        }

        let num_bytes = buffer.len().min(state.available);
        if !flags.contains(ReadDataFlags::DISCARD) {
            state.copy_out(&mut buffer[..num_bytes]);
        }
        if !flags.contains(ReadDataFlags::PEEK) {
            state.consume(num_bytes);
            self.notify_both(&mut state);
        }
        Ok(num_bytes)
    }

    /// Reserves the largest contiguous free region
    pub fn begin_write_data(self: &Arc<Self>) -> KernelResult<WriteLease> {
        let mut state = self.state.lock();
        if !state.producer_open {
            return Err(KernelError::InvalidArgument);
        }
        if state.two_phase_write.is_some() {
            return Err(KernelError::Busy);
        }
        if !state.consumer_open {
            return Err(KernelError::FailedPrecondition);
        }
        let free = state.free_space();
        if free == 0 {
            return Err(KernelError::ShouldWait);
        }

        let offset = state.write_offset();
        let len = free.min(state.capacity() - offset);
        state.two_phase_write = Some(len);
        state.write_epoch += 1;
        let epoch = state.write_epoch;
        self.notify_both(&mut state);
        Ok(WriteLease {
            pipe: Arc::clone(self),
            epoch,
            offset,
            len,
        })
    }

    /// Commits `num_bytes` of the reserved region and ends the two-phase write
    ///
    /// An invalid count ends the two-phase write with nothing committed.
    pub fn end_write_data(&self, num_bytes: usize) -> KernelResult<()> {
        let mut state = self.state.lock();
        if !state.producer_open {
            return Err(KernelError::InvalidArgument);
        }
        let reserved = state.two_phase_write.take().ok_or(KernelError::FailedPrecondition)?;
        state.write_epoch += 1;

        let result = if num_bytes > reserved || !self.is_multiple(num_bytes) {
            Err(KernelError::InvalidArgument)
        } else {
            if state.consumer_open {
                state.available += num_bytes;
            }
            Ok(())
        };
        self.notify_both(&mut state);
        result
    }

    /// Exposes the largest contiguous readable region
    pub fn begin_read_data(self: &Arc<Self>) -> KernelResult<ReadLease> {
        let mut state = self.state.lock();
        if !state.consumer_open {
            return Err(KernelError::InvalidArgument);
        }
        if state.two_phase_read.is_some() {
            return Err(KernelError::Busy);
        }
        if state.available == 0 {
            return Err(if state.producer_open {
                KernelError::ShouldWait
            } else {
                KernelError::FailedPrecondition
            });
        }

        let offset = state.start;
        let len = state.available.min(state.capacity() - offset);
        state.two_phase_read = Some(len);
        state.read_epoch += 1;
        let epoch = state.read_epoch;
        self.notify_both(&mut state);
        Ok(ReadLease {
            pipe: Arc::clone(self),
            epoch,
            offset,
            len,
        })
    }

    /// Consumes `num_bytes` of the exposed region and ends the two-phase read
    ///
    /// An invalid count ends the two-phase read with nothing consumed.
    pub fn end_read_data(&self, num_bytes: usize) -> KernelResult<()> {
        let mut state = self.state.lock();
        if !state.consumer_open {
            return Err(KernelError::InvalidArgument);
        }
        let exposed = state.two_phase_read.take().ok_or(KernelError::FailedPrecondition)?;
        state.read_epoch += 1;

        let result = if num_bytes > exposed || !self.is_multiple(num_bytes) {
            Err(KernelError::InvalidArgument)
        } else {
            state.consume(num_bytes);
            Ok(())
        };
        self.notify_both(&mut state);
        result
    }

    pub fn add_waiter(
        &self,
        side: Side,
        waiter: &Arc<Waiter>,
        signals: Signals,
        context: usize,
    ) -> Registration {
        let mut state = self.state.lock();
        let current = self.side_state(&state, side);
        let (open, waiters) = match side {
            Side::Producer => (state.producer_open, &mut state.producer_waiters),
            Side::Consumer => (state.consumer_open, &mut state.consumer_waiters),
        };
        if !open {
            return Registration::Ready(WakeReason::HandleClosed, SignalsState::none());
        }
        waiter::register(waiters, current, waiter, signals, context)
    }

    pub fn remove_waiter(&self, side: Side, id: WaiterId) {
        let mut state = self.state.lock();
        match side {
            Side::Producer => state.producer_waiters.remove(id),
            Side::Consumer => state.consumer_waiters.remove(id),
        }
    }

    /// Ends every pending wait on `side` without closing it
    pub fn cancel_waiters(&self, side: Side) {
        let mut state = self.state.lock();
        match side {
            Side::Producer => state.producer_waiters.cancel_all(),
            Side::Consumer => state.consumer_waiters.cancel_all(),
        }
    }

    /// Closes one side; the other side sees PEER_CLOSED immediately
    pub fn close(&self, side: Side) {
        let mut state = self.state.lock();
        match side {
            Side::Producer => {
                if !state.producer_open {
                    return;
                }
                state.producer_open = false;
                if state.two_phase_write.take().is_some() {
                    state.write_epoch += 1;
                }
                state.producer_waiters.cancel_all();
            }
            Side::Consumer => {
                if !state.consumer_open {
                    return;
                }
                state.consumer_open = false;
                if state.two_phase_read.take().is_some() {
                    state.read_epoch += 1;
                }
                state.available = 0;
                state.consumer_waiters.cancel_all();
            }
        }
        self.notify_both(&mut state);
    }
}

/// In-place access to a region reserved by `begin_write_data`
#[derive(Debug)]
pub struct WriteLease {
    pipe: Arc<DataPipe>,
    epoch: u64,
    offset: usize,
    len: usize,
}

impl WriteLease {
    /// Size of the reserved region
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runs `f` over the reserved region
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> KernelResult<R> {
        let mut state = self.pipe.state.lock();
        if state.write_epoch != self.epoch || state.two_phase_write.is_none() {
            return Err(KernelError::FailedPrecondition);
        }
        Ok(f(&mut state.buffer[self.offset..self.offset + self.len]))
    }

    /// Copies `data` into the reserved region at `at`
    pub fn write_at(&self, at: usize, data: &[u8]) -> KernelResult<()> {
        if at.checked_add(data.len()).map_or(true, |end| end > self.len) {
            return Err(KernelError::InvalidArgument);
        }
        self.with_buffer(|buffer| buffer[at..at + data.len()].copy_from_slice(data))
    }
}

/// In-place access to a region exposed by `begin_read_data`
#[derive(Debug)]
pub struct ReadLease {
    pipe: Arc<DataPipe>,
    epoch: u64,
    offset: usize,
    len: usize,
}

impl ReadLease {
    /// Size of the exposed region
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runs `f` over the exposed region
    pub fn with_buffer<R>(&self, f: impl FnOnce(&[u8]) -> R) -> KernelResult<R> {
        let state = self.pipe.state.lock();
        if state.read_epoch != self.epoch || state.two_phase_read.is_none() {
            return Err(KernelError::FailedPrecondition);
        }
        Ok(f(&state.buffer[self.offset..self.offset + self.len]))
    }

    /// Copies the exposed region out
    pub fn to_vec(&self) -> KernelResult<Vec<u8>> {
        self.with_buffer(|buffer| buffer.to_vec())
    }
}
