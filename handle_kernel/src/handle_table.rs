//! Handle tables
//!
//! A handle table maps handle values to dispatchers for one system. Values
//! are allocated sequentially, skip the invalid value `0`, and wrap around
//! once the counter runs out, skipping values still in use.
//!
//! An entry can be marked busy while a `write_message` is moving it into a
//! message. Busy entries cannot be used, closed or transferred until the
//! write either commits (the entry is removed) or fails (the mark is cleared).

use crate::dispatcher::Dispatcher;
use core_types::Handle;
use kernel_api::{KernelError, KernelResult};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct HandleEntry {
    dispatcher: Arc<Dispatcher>,
    busy: bool,
}

/// Handle namespace of one system
#[derive(Debug)]
pub struct HandleTable {
    entries: HashMap<Handle, HandleEntry>,
    next: u32,
    max_handles: usize,
}

impl HandleTable {
    pub fn new(max_handles: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next: 1,
            max_handles: max_handles.min(u32::MAX as usize - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_handles(&self) -> usize {
        self.max_handles
    }

    /// Number of handles that can still be added
    pub fn remaining_capacity(&self) -> usize {
        self.max_handles.saturating_sub(self.entries.len())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    fn allocate(&mut self) -> Handle {
        loop {
            let candidate = Handle::from_raw(self.next);
            self.next = self.next.checked_add(1).unwrap_or(1);
            if candidate.is_valid() && !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn insert(&mut self, dispatcher: Arc<Dispatcher>) -> Handle {
        let handle = self.allocate();
        self.entries.insert(
            handle,
            HandleEntry {
                dispatcher,
                busy: false,
            },
        );
        handle
    }

    /// Adds one dispatcher
    pub fn add(&mut self, dispatcher: Arc<Dispatcher>) -> KernelResult<Handle> {
        if self.remaining_capacity() < 1 {
            return Err(KernelError::ResourceExhausted);
        }
        Ok(self.insert(dispatcher))
    }

    /// Adds two dispatchers, or neither
    pub fn add_pair(
        &mut self,
        first: Arc<Dispatcher>,
        second: Arc<Dispatcher>,
    ) -> KernelResult<(Handle, Handle)> {
        if self.remaining_capacity() < 2 {
            return Err(KernelError::ResourceExhausted);
        }
        Ok((self.insert(first), self.insert(second)))
    }

    /// Adds every dispatcher in order, or none of them
    pub fn add_many(&mut self, dispatchers: &[Arc<Dispatcher>]) -> KernelResult<Vec<Handle>> {
        if self.remaining_capacity() < dispatchers.len() {
            return Err(KernelError::ResourceExhausted);
        }
        Ok(dispatchers
            .iter()
            .map(|dispatcher| self.insert(Arc::clone(dispatcher)))
            .collect())
    }

    /// Resolves a handle that is not busy
    pub fn get_dispatcher(&self, handle: Handle) -> KernelResult<Arc<Dispatcher>> {
        let entry = self
            .entries
            .get(&handle)
            .ok_or(KernelError::InvalidArgument)?;
        if entry.busy {
            return Err(KernelError::Busy);
        }
        Ok(Arc::clone(&entry.dispatcher))
    }

    /// Removes a handle that is not busy
    pub fn remove(&mut self, handle: Handle) -> KernelResult<Arc<Dispatcher>> {
        let entry = self
            .entries
            .get(&handle)
            .ok_or(KernelError::InvalidArgument)?;
        if entry.busy {
            return Err(KernelError::Busy);
        }
        self.entries
            .remove(&handle)
            .map(|entry| entry.dispatcher)
            .ok_or(KernelError::Internal)
    }

    /// Marks a resolved handle busy and returns its dispatcher
    pub fn mark_busy(&mut self, handle: Handle) -> KernelResult<Arc<Dispatcher>> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(KernelError::InvalidArgument)?;
        if entry.busy {
            return Err(KernelError::Busy);
        }
        entry.busy = true;
        Ok(Arc::clone(&entry.dispatcher))
    }

    /// Clears the busy mark after a failed transfer
    pub fn restore(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.busy = false;
        }
    }

    /// Removes a busy handle after a committed transfer
    pub fn remove_busy(&mut self, handle: Handle) -> Option<Arc<Dispatcher>> {
        match self.entries.get(&handle) {
            Some(entry) if entry.busy => self.entries.remove(&handle).map(|entry| entry.dispatcher),
            _ => None,
        }
    }

    /// Removes every entry, busy or not
    pub fn drain(&mut self) -> Vec<(Handle, Arc<Dispatcher>)> {
        self.entries
            .drain()
            .map(|(handle, entry)| (handle, entry.dispatcher))
            .collect()
    }
}
