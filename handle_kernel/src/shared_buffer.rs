//! Shared buffers
//!
//! A shared region is reachable from every handle duplicated from the
//! original and from every live mapping. The region is freed when the last of
//! those goes away, in whatever order that happens.
//!
//! Mappings may overlap and may be used from several threads. Each byte is
//! stored as an atomic so concurrent access is defined; ordering between
//! bytes is up to the callers, as with any shared memory.

use core_types::SystemId;
use kernel_api::{KernelError, KernelResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Backing storage of a shared buffer
#[derive(Debug)]
pub struct SharedRegion {
    bytes: Box<[AtomicU8]>,
}

impl SharedRegion {
    /// Allocates a zero-filled region
    pub fn new(num_bytes: usize) -> Arc<Self> {
        let bytes = (0..num_bytes).map(|_| AtomicU8::new(0)).collect();
        Arc::new(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Checks that `[offset, offset + num_bytes)` is a non-empty range
    /// inside the region
    pub fn check_range(&self, offset: u64, num_bytes: u64) -> KernelResult<(usize, usize)> {
        if num_bytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let end = offset
            .checked_add(num_bytes)
            .ok_or(KernelError::InvalidArgument)?;
        if end > self.bytes.len() as u64 {
            return Err(KernelError::InvalidArgument);
        }
        Ok((offset as usize, num_bytes as usize))
    }
}

/// Identifier of a mapping within its system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingId(u64);

/// Live mappings of one system
#[derive(Debug)]
pub struct MappingRegistry {
    system: SystemId,
    next_id: AtomicU64,
    live: Mutex<HashSet<MappingId>>,
}

impl MappingRegistry {
    pub fn new(system: SystemId) -> Arc<Self> {
        Arc::new(Self {
            system,
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
        })
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    /// Number of mappings not yet unmapped
    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.lock().is_empty()
    }

    /// Creates a mapping of `region[offset..offset + len]`
    pub fn map(
        self: &Arc<Self>,
        region: Arc<SharedRegion>,
        offset: usize,
        len: usize,
    ) -> BufferMapping {
        let id = MappingId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(id);
        BufferMapping {
            id,
            registry: Arc::clone(self),
            region,
            offset,
            len,
        }
    }

    /// Returns true if `mapping` was created here and is still live
    pub fn owns(self: &Arc<Self>, mapping: &BufferMapping) -> bool {
        Arc::ptr_eq(self, &mapping.registry) && self.live.lock().contains(&mapping.id)
    }
}

/// A mapped range of a shared region
///
/// Keeps the region alive on its own; closing every handle to the buffer does
/// not invalidate it. Dropping the mapping unmaps it.
#[derive(Debug)]
pub struct BufferMapping {
    id: MappingId,
    registry: Arc<MappingRegistry>,
    region: Arc<SharedRegion>,
    offset: usize,
    len: usize,
}

impl BufferMapping {
    pub fn id(&self) -> MappingId {
        self.id
    }

    /// The system that created this mapping
    pub fn system(&self) -> SystemId {
        self.registry.system()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the byte at `index` within the mapping
    pub fn get(&self, index: usize) -> Option<u8> {
        if index >= self.len {
            return None;
        }
        Some(self.region.bytes[self.offset + index].load(Ordering::Acquire))
    }

    /// Writes the byte at `index` within the mapping
    pub fn set(&self, index: usize, value: u8) -> KernelResult<()> {
        if index >= self.len {
            return Err(KernelError::OutOfRange);
        }
        self.region.bytes[self.offset + index].store(value, Ordering::Release);
        Ok(())
    }

    /// Copies `data` into the mapping starting at `at`
    pub fn write(&self, at: usize, data: &[u8]) -> KernelResult<()> {
        let range = self.subrange(at, data.len())?;
        for (cell, value) in self.region.bytes[range].iter().zip(data) {
            cell.store(*value, Ordering::Release);
        }
        Ok(())
    }

    /// Copies bytes starting at `at` into `out`
    pub fn read(&self, at: usize, out: &mut [u8]) -> KernelResult<()> {
        let range = self.subrange(at, out.len())?;
        for (value, cell) in out.iter_mut().zip(&self.region.bytes[range]) {
            *value = cell.load(Ordering::Acquire);
        }
        Ok(())
    }

    /// Copies the whole mapping out
    pub fn to_vec(&self) -> Vec<u8> {
        self.region.bytes[self.offset..self.offset + self.len]
            .iter()
            .map(|cell| cell.load(Ordering::Acquire))
            .collect()
    }

    fn subrange(&self, at: usize, num_bytes: usize) -> KernelResult<std::ops::Range<usize>> {
        match at.checked_add(num_bytes) {
            Some(end) if end <= self.len => Ok(self.offset + at..self.offset + end),
            _ => Err(KernelError::OutOfRange),
        }
    }
}

impl Drop for BufferMapping {
    fn drop(&mut self) {
        self.registry.live.lock().remove(&self.id);
    }
}
