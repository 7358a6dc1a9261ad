//! Dispatchers
//!
//! A dispatcher is what a handle refers to: one end of a message pipe, one
//! side of a data pipe, or a reference to a shared region. Handle tables and
//! in-flight messages hold dispatchers behind `Arc`; a dispatcher closes its
//! resource explicitly when its handle is closed, or on drop if it was never
//! closed (for example when it was still sitting in an unread message).

use crate::data_pipe::{DataPipe, Side};
use crate::message_pipe::{MessagePipe, Port};
use crate::message_queue::Message;
use crate::shared_buffer::SharedRegion;
use crate::waiter::{Registration, WakeReason, Waiter, WaiterId};
use core_types::{Signals, SignalsState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Resource kind behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatcherKind {
    MessagePipeEndpoint,
    DataPipeProducer,
    DataPipeConsumer,
    SharedBuffer,
}

impl fmt::Display for DispatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatcherKind::MessagePipeEndpoint => "message pipe endpoint",
            DispatcherKind::DataPipeProducer => "data pipe producer",
            DispatcherKind::DataPipeConsumer => "data pipe consumer",
            DispatcherKind::SharedBuffer => "shared buffer",
        };
        f.write_str(name)
    }
}

/// One end of a message pipe
#[derive(Clone)]
pub struct MessagePipeEndpoint {
    pub pipe: Arc<MessagePipe>,
    pub port: Port,
}

/// The object a handle refers to
pub enum Dispatcher {
    MessagePipeEndpoint(MessagePipeEndpoint),
    DataPipeProducer(Arc<DataPipe>),
    DataPipeConsumer(Arc<DataPipe>),
    SharedBuffer(Arc<SharedRegion>),
}

impl Dispatcher {
    /// Creates both endpoints of a new message pipe
    pub fn message_pipe_pair(max_queued_messages: usize) -> (Dispatcher, Dispatcher) {
        let pipe = MessagePipe::new(max_queued_messages);
        (
            Dispatcher::MessagePipeEndpoint(MessagePipeEndpoint {
                pipe: Arc::clone(&pipe),
                port: 0,
            }),
            Dispatcher::MessagePipeEndpoint(MessagePipeEndpoint { pipe, port: 1 }),
        )
    }

    /// Creates the producer and consumer of a new data pipe
    pub fn data_pipe_pair(element_num_bytes: usize, capacity_num_bytes: usize) -> (Dispatcher, Dispatcher) {
        let pipe = DataPipe::new(element_num_bytes, capacity_num_bytes);
        (
            Dispatcher::DataPipeProducer(Arc::clone(&pipe)),
            Dispatcher::DataPipeConsumer(pipe),
        )
    }

    pub fn kind(&self) -> DispatcherKind {
        match self {
            Dispatcher::MessagePipeEndpoint(_) => DispatcherKind::MessagePipeEndpoint,
            Dispatcher::DataPipeProducer(_) => DispatcherKind::DataPipeProducer,
            Dispatcher::DataPipeConsumer(_) => DispatcherKind::DataPipeConsumer,
            Dispatcher::SharedBuffer(_) => DispatcherKind::SharedBuffer,
        }
    }

    pub fn signals_state(&self) -> SignalsState {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => endpoint.pipe.signals_state(endpoint.port),
            Dispatcher::DataPipeProducer(pipe) => pipe.signals_state(Side::Producer),
            Dispatcher::DataPipeConsumer(pipe) => pipe.signals_state(Side::Consumer),
            Dispatcher::SharedBuffer(_) => SignalsState::none(),
        }
    }

    /// Registers `waiter` for `signals`, or decides the wait immediately
    pub fn add_waiter(&self, waiter: &Arc<Waiter>, signals: Signals, context: usize) -> Registration {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => {
                endpoint.pipe.add_waiter(endpoint.port, waiter, signals, context)
            }
            Dispatcher::DataPipeProducer(pipe) => {
                pipe.add_waiter(Side::Producer, waiter, signals, context)
            }
            Dispatcher::DataPipeConsumer(pipe) => {
                pipe.add_waiter(Side::Consumer, waiter, signals, context)
            }
            Dispatcher::SharedBuffer(_) => {
                Registration::Ready(WakeReason::Unsatisfiable, SignalsState::none())
            }
        }
    }

    pub fn remove_waiter(&self, id: WaiterId) {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => endpoint.pipe.remove_waiter(endpoint.port, id),
            Dispatcher::DataPipeProducer(pipe) => pipe.remove_waiter(Side::Producer, id),
            Dispatcher::DataPipeConsumer(pipe) => pipe.remove_waiter(Side::Consumer, id),
            Dispatcher::SharedBuffer(_) => {}
        }
    }

    /// Ends pending waits made through the handle this dispatcher is leaving
    pub fn cancel_waiters(&self) {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => endpoint.pipe.cancel_waiters(endpoint.port),
            Dispatcher::DataPipeProducer(pipe) => pipe.cancel_waiters(Side::Producer),
            Dispatcher::DataPipeConsumer(pipe) => pipe.cancel_waiters(Side::Consumer),
            Dispatcher::SharedBuffer(_) => {}
        }
    }

    /// Returns true while a two-phase operation pins this dispatcher
    pub fn in_two_phase(&self) -> bool {
        match self {
            Dispatcher::DataPipeProducer(pipe) => pipe.in_two_phase(Side::Producer),
            Dispatcher::DataPipeConsumer(pipe) => pipe.in_two_phase(Side::Consumer),
            _ => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => !endpoint.pipe.is_open(endpoint.port),
            Dispatcher::DataPipeProducer(pipe) => !pipe.is_open(Side::Producer),
            Dispatcher::DataPipeConsumer(pipe) => !pipe.is_open(Side::Consumer),
            Dispatcher::SharedBuffer(_) => false,
        }
    }

    /// Closes the underlying resource end; idempotent
    ///
    /// Dispatchers carried by messages that were still queued on a closed
    /// endpoint are closed too, after the pipe lock is released.
    pub fn close(&self) {
        let orphaned = match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => endpoint.pipe.close(endpoint.port),
            Dispatcher::DataPipeProducer(pipe) => {
                pipe.close(Side::Producer);
                Vec::new()
            }
            Dispatcher::DataPipeConsumer(pipe) => {
                pipe.close(Side::Consumer);
                Vec::new()
            }
            Dispatcher::SharedBuffer(_) => Vec::new(),
        };
        close_messages(orphaned);
    }

    pub fn as_message_pipe_endpoint(&self) -> Option<&MessagePipeEndpoint> {
        match self {
            Dispatcher::MessagePipeEndpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    pub fn as_data_pipe_producer(&self) -> Option<&Arc<DataPipe>> {
        match self {
            Dispatcher::DataPipeProducer(pipe) => Some(pipe),
            _ => None,
        }
    }

    pub fn as_data_pipe_consumer(&self) -> Option<&Arc<DataPipe>> {
        match self {
            Dispatcher::DataPipeConsumer(pipe) => Some(pipe),
            _ => None,
        }
    }

    pub fn as_shared_buffer(&self) -> Option<&Arc<SharedRegion>> {
        match self {
            Dispatcher::SharedBuffer(region) => Some(region),
            _ => None,
        }
    }
}

/// Closes every dispatcher carried by `messages`
pub fn close_messages(messages: Vec<Message>) {
    for message in messages {
        for dispatcher in message.dispatchers {
            dispatcher.close();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kind", &self.kind())
            .finish()
    }
}
