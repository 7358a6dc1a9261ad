//! Per-port message queues
//!
//! FIFO with a hard cap on queued messages. A message that was taken off the
//! head and could not be delivered goes back to the head, even past the cap.

use crate::dispatcher::Dispatcher;
use kernel_api::MessageSizes;
use std::collections::VecDeque;
use std::sync::Arc;

/// A queued message: payload bytes plus the dispatchers it carries.
#[derive(Debug, Default)]
pub struct Message {
    pub bytes: Vec<u8>,
    pub dispatchers: Vec<Arc<Dispatcher>>,
}

impl Message {
    pub fn new(bytes: Vec<u8>, dispatchers: Vec<Arc<Dispatcher>>) -> Self {
        Self { bytes, dispatchers }
    }

    /// Byte and handle counts of this message.
    pub fn sizes(&self) -> MessageSizes {
        MessageSizes {
            num_bytes: self.bytes.len(),
            num_handles: self.dispatchers.len(),
        }
    }
}

/// Returned by [`MessageQueue::push`] when the queue is full; gives the
/// message back.
#[derive(Debug)]
pub struct QueueFull(pub Message);

/// Bounded FIFO queue of messages.
#[derive(Debug)]
pub struct MessageQueue {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages that can still be pushed
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.messages.len())
    }

    pub fn push(&mut self, message: Message) -> Result<(), QueueFull> {
        if self.messages.len() >= self.capacity {
            return Err(QueueFull(message));
        }
        self.messages.push_back(message);
        Ok(())
    }

    /// Puts a message back at the head, ignoring capacity.
    pub fn push_front(&mut self, message: Message) {
        self.messages.push_front(message);
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn front(&self) -> Option<&Message> {
        self.messages.front()
    }

    /// Empties the queue, oldest first
    pub fn drain(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }
}
