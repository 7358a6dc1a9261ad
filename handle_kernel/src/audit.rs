//! Handle Audit Trail
//!
//! This module records handle lifecycle events for one system so tests and
//! diagnostics can check where every handle came from and where it went.
//!
//! ## Philosophy
//!
//! - Bounded: the log keeps the most recent events and drops the oldest
//! - Ordered: events are kept in the order they happened
//! - Queryable: tests can assert on the trail to verify ownership transfer
//!
//! ## Example
//!
//! ```
//! use handle_kernel::audit::{HandleAuditLog, HandleEvent};
//! use handle_kernel::dispatcher::DispatcherKind;
//! use core_types::Handle;
//! use kernel_api::TimeTicks;
//!
//! let mut audit_log = HandleAuditLog::with_capacity(16);
//!
//! audit_log.record_event(
//!     TimeTicks::from_micros(1000),
//!     HandleEvent::Created {
//!         handle: Handle::from_raw(1),
//!         kind: DispatcherKind::SharedBuffer,
//!     },
//! );
//!
//! assert_eq!(audit_log.len(), 1);
//! ```

use crate::dispatcher::DispatcherKind;
use core_types::{Handle, SystemId};
use kernel_api::TimeTicks;
use kernel_config::AuditConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A handle lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleEvent {
    /// A new resource was created behind `handle`
    Created { handle: Handle, kind: DispatcherKind },
    /// `handle` was closed
    Closed { handle: Handle, kind: DispatcherKind },
    /// `handle` was moved out to another system
    TransferredOut { handle: Handle, to: SystemId },
    /// A handle moved in from another system arrived as `handle`
    TransferredIn { handle: Handle, from: SystemId },
    /// `handle` was destroyed because the destination table was full
    TransferLost { handle: Handle, to: SystemId },
    /// `handle` was attached to a message written on `via`
    SentInMessage { handle: Handle, via: Handle },
    /// A handle carried by a message read on `via` arrived as `handle`
    ReceivedFromMessage { handle: Handle, via: Handle },
    /// `handle` was created as a duplicate of `source`
    Duplicated { source: Handle, handle: Handle },
    /// A range of the buffer behind `handle` was mapped
    Mapped {
        handle: Handle,
        offset: u64,
        num_bytes: u64,
    },
    /// A mapping of `num_bytes` was released
    Unmapped { num_bytes: u64 },
}

impl HandleEvent {
    /// The handle the event is about, if it names one
    pub fn handle(&self) -> Option<Handle> {
        match self {
            HandleEvent::Created { handle, .. }
            | HandleEvent::Closed { handle, .. }
            | HandleEvent::TransferredOut { handle, .. }
            | HandleEvent::TransferredIn { handle, .. }
            | HandleEvent::TransferLost { handle, .. }
            | HandleEvent::SentInMessage { handle, .. }
            | HandleEvent::ReceivedFromMessage { handle, .. }
            | HandleEvent::Duplicated { handle, .. }
            | HandleEvent::Mapped { handle, .. } => Some(*handle),
            HandleEvent::Unmapped { .. } => None,
        }
    }
}

/// A single audit event with timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleAuditEvent {
    /// When the event occurred
    pub timestamp: TimeTicks,
    /// The handle event that occurred
    pub event: HandleEvent,
}

/// Audit log for handle operations
#[derive(Debug)]
pub struct HandleAuditLog {
    events: VecDeque<HandleAuditEvent>,
    capacity: usize,
    enabled: bool,
}

impl HandleAuditLog {
    /// Creates an enabled log holding up to `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            enabled: true,
        }
    }

    /// Creates a log from configuration
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: config.capacity,
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a handle event at the specified time
    pub fn record_event(&mut self, timestamp: TimeTicks, event: HandleEvent) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(HandleAuditEvent { timestamp, event });
    }

    /// Returns all retained events, oldest first
    pub fn get_events(&self) -> Vec<HandleAuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Returns retained events about a specific handle value
    pub fn get_events_for_handle(&self, handle: Handle) -> Vec<&HandleAuditEvent> {
        self.events
            .iter()
            .filter(|e| e.event.handle() == Some(handle))
            .collect()
    }

    /// Counts events matching the predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&HandleEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(&e.event)).count()
    }

    /// Checks if any event matches the predicate
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&HandleEvent) -> bool,
    {
        self.events.iter().any(|e| predicate(&e.event))
    }

    /// Clears all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns the number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Checks if the audit log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
