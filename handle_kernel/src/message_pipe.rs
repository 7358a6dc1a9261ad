//! Message pipes
//!
//! A message pipe has two ports. Each port owns the queue of messages
//! addressed to it and the waiters registered on its endpoint. One lock guards
//! both ports, so a write and the peer's signal update are a single step.
//!
//! Messages that must be thrown away (discarded reads, queues of a closed
//! port) are always handed back to the caller, never dropped under the lock:
//! dropping a message may close the dispatchers it carries, and those may
//! belong to this very pipe.

use crate::message_queue::{Message, MessageQueue, QueueFull};
use crate::waiter::{self, Registration, WakeReason, Waiter, WaiterId, WaiterSet};
use core_types::{Signals, SignalsState};
use kernel_api::{KernelError, ReadMessageError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Index of a port within its pipe
pub type Port = usize;

#[derive(Debug)]
struct PortState {
    open: bool,
    incoming: MessageQueue,
    waiters: WaiterSet,
}

#[derive(Debug)]
struct PipeState {
    ports: [PortState; 2],
}

impl PipeState {
    fn signals_state(&self, port: Port) -> SignalsState {
        let this = &self.ports[port];
        if !this.open {
            return SignalsState::none();
        }
        let peer_open = self.ports[peer_of(port)].open;

        let mut satisfied = Signals::NONE;
        let mut satisfiable = Signals::PEER_CLOSED;
        if !this.incoming.is_empty() {
            satisfied |= Signals::READABLE;
            satisfiable |= Signals::READABLE;
        }
        if peer_open {
            satisfied |= Signals::WRITABLE;
            satisfiable |= Signals::READABLE | Signals::WRITABLE;
        } else {
            satisfied |= Signals::PEER_CLOSED;
        }
        SignalsState::new(satisfied, satisfiable)
    }

    fn notify(&mut self, port: Port) {
        let state = self.signals_state(port);
        self.ports[port].waiters.notify(state);
    }
}

fn peer_of(port: Port) -> Port {
    port ^ 1
}

/// Failed read; `discarded` holds a message dropped under `MAY_DISCARD`
#[derive(Debug)]
pub struct ReadFailure {
    pub error: ReadMessageError,
    pub discarded: Option<Message>,
}

impl From<KernelError> for ReadFailure {
    fn from(error: KernelError) -> Self {
        Self {
            error: ReadMessageError::new(error),
            discarded: None,
        }
    }
}

/// Shared state of both endpoints of one pipe
#[derive(Debug)]
pub struct MessagePipe {
    state: Mutex<PipeState>,
}

impl MessagePipe {
    /// Creates a pipe whose ports each queue up to `max_queued_messages`
    pub fn new(max_queued_messages: usize) -> Arc<Self> {
        let port = || PortState {
            open: true,
            incoming: MessageQueue::with_capacity(max_queued_messages),
            waiters: WaiterSet::new(),
        };
        Arc::new(Self {
            state: Mutex::new(PipeState {
                ports: [port(), port()],
            }),
        })
    }

    pub fn signals_state(&self, port: Port) -> SignalsState {
        self.state.lock().signals_state(port)
    }

    pub fn is_open(&self, port: Port) -> bool {
        self.state.lock().ports[port].open
    }

    /// Number of messages waiting to be read on `port`
    pub fn queued_messages(&self, port: Port) -> usize {
        self.state.lock().ports[port].incoming.len()
    }

    /// Queues `message` on the peer of `port`
    ///
    /// On failure the message is returned untouched.
    pub fn write_message(&self, port: Port, message: Message) -> Result<(), (KernelError, Message)> {
        let mut state = self.state.lock();
        if !state.ports[port].open {
            return Err((KernelError::InvalidArgument, message));
        }
        let peer = peer_of(port);
        if !state.ports[peer].open {
            return Err((KernelError::FailedPrecondition, message));
        }
        if let Err(QueueFull(message)) = state.ports[peer].incoming.push(message) {
            return Err((KernelError::ResourceExhausted, message));
        }
        state.notify(peer);
        Ok(())
    }

    /// Dequeues the head message of `port`
    ///
    /// The head must fit in `max_bytes`/`max_handles`, and its handles must
    /// fit in `handle_room` free table slots; otherwise it stays queued
    /// (unless `may_discard` is set and the buffers were too small).
    pub fn read_message(
        &self,
        port: Port,
        max_bytes: usize,
        max_handles: usize,
        handle_room: usize,
        may_discard: bool,
    ) -> Result<Message, ReadFailure> {
        let mut state = self.state.lock();
        if !state.ports[port].open {
            return Err(KernelError::InvalidArgument.into());
        }
        let peer_open = state.ports[peer_of(port)].open;

        let sizes = match state.ports[port].incoming.front() {
            Some(head) => head.sizes(),
            None if peer_open => return Err(KernelError::ShouldWait.into()),
            None => return Err(KernelError::FailedPrecondition.into()),
        };

        if sizes.num_bytes > max_bytes || sizes.num_handles > max_handles {
            let discarded = if may_discard {
                let message = state.ports[port].incoming.pop();
                state.notify(port);
                message
            } else {
                None
            };
            return Err(ReadFailure {
                error: ReadMessageError::too_small(sizes),
                discarded,
            });
        }
        if sizes.num_handles > handle_room {
            return Err(KernelError::ResourceExhausted.into());
        }

        let message = state.ports[port].incoming.pop();
        state.notify(port);
        message.ok_or_else(|| KernelError::Internal.into())
    }

    /// Puts a message back at the head of `port` after a failed delivery
    pub fn requeue_front(&self, port: Port, message: Message) {
        let mut state = self.state.lock();
        state.ports[port].incoming.push_front(message);
        state.notify(port);
    }

    pub fn add_waiter(
        &self,
        port: Port,
        waiter: &Arc<Waiter>,
        signals: Signals,
        context: usize,
    ) -> Registration {
        let mut state = self.state.lock();
        if !state.ports[port].open {
            return Registration::Ready(WakeReason::HandleClosed, SignalsState::none());
        }
        let current = state.signals_state(port);
        waiter::register(&mut state.ports[port].waiters, current, waiter, signals, context)
    }

    pub fn remove_waiter(&self, port: Port, id: WaiterId) {
        self.state.lock().ports[port].waiters.remove(id);
    }

    /// Ends every pending wait on `port` without closing it
    pub fn cancel_waiters(&self, port: Port) {
        self.state.lock().ports[port].waiters.cancel_all();
    }

    /// Closes `port` and returns its undelivered messages
    ///
    /// Returns an empty list when the port was already closed.
    pub fn close(&self, port: Port) -> Vec<Message> {
        let mut state = self.state.lock();
        if !state.ports[port].open {
            return Vec::new();
        }
        state.ports[port].open = false;
        state.ports[port].waiters.cancel_all();
        let orphaned = state.ports[port].incoming.drain();
        state.notify(peer_of(port));
        orphaned
    }
}
