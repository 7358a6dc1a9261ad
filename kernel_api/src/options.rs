//! Versioned options structs
//!
//! Every options struct starts with a `struct_size` field. A caller built
//! against an older layout passes a smaller `struct_size`; fields that lie
//! beyond it are read as their defaults. Fields past our own layout (a caller
//! built against a newer one) are ignored.
//!
//! The flat byte form is little-endian with fields packed in declaration
//! order, which is also how `struct_size` is measured.

use crate::error::{KernelError, KernelResult};
use crate::flags::BufferInformationFlags;
use serde::{Deserialize, Serialize};

/// Size of the leading `struct_size` field
const STRUCT_SIZE_FIELD: usize = 4;

/// Common behaviour of the versioned options structs
pub trait VersionedOptions: Sized {
    /// Size of the complete current layout
    const FULL_SIZE: u32;

    /// Declared size of this instance
    fn struct_size(&self) -> u32;

    /// Encodes the full layout; `struct_size` is written as declared
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes a struct, defaulting fields beyond the declared size
    fn from_bytes(bytes: &[u8]) -> KernelResult<Self>;

    /// Returns a copy with every field beyond `struct_size` reset to default
    ///
    /// Fails with `InvalidArgument` when `struct_size` cannot even hold itself.
    fn normalized(&self) -> KernelResult<Self> {
        Self::from_bytes(&self.to_bytes())
    }
}

/// Validates the header and returns the bytes covered by `struct_size`
fn declared_region(bytes: &[u8], full_size: u32) -> KernelResult<&[u8]> {
    let header = bytes
        .get(..STRUCT_SIZE_FIELD)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .ok_or(KernelError::InvalidArgument)?;
    let struct_size = u32::from_le_bytes(header) as usize;
    if struct_size < STRUCT_SIZE_FIELD {
        return Err(KernelError::InvalidArgument);
    }
    if bytes.len() < struct_size.min(full_size as usize) {
        return Err(KernelError::InvalidArgument);
    }
    Ok(&bytes[..struct_size.min(bytes.len())])
}

fn read_u32(region: &[u8], offset: usize) -> Option<u32> {
    region
        .get(offset..offset + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
}

fn read_u64(region: &[u8], offset: usize) -> Option<u64> {
    region
        .get(offset..offset + 8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_le_bytes)
}

fn declared_size(region: &[u8]) -> u32 {
    read_u32(region, 0).unwrap_or(STRUCT_SIZE_FIELD as u32)
}

/// Options for `create_message_pipe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMessagePipeOptions {
    pub struct_size: u32,
    /// Reserved; must be zero
    pub flags: u32,
}

impl Default for CreateMessagePipeOptions {
    fn default() -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            flags: 0,
        }
    }
}

impl VersionedOptions for CreateMessagePipeOptions {
    const FULL_SIZE: u32 = 8;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        let defaults = Self::default();
        Ok(Self {
            struct_size: declared_size(region),
            flags: read_u32(region, 4).unwrap_or(defaults.flags),
        })
    }
}

/// Options for `create_data_pipe`
///
/// A `capacity_num_bytes` of zero selects the configured default capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDataPipeOptions {
    pub struct_size: u32,
    /// Reserved; must be zero
    pub flags: u32,
    /// Size of one element; all transfers are multiples of it
    pub element_num_bytes: u32,
    /// Ring capacity in bytes, or zero for the default
    pub capacity_num_bytes: u32,
}

impl CreateDataPipeOptions {
    /// Options for a pipe with the given element size and capacity
    pub fn new(element_num_bytes: u32, capacity_num_bytes: u32) -> Self {
        Self {
            element_num_bytes,
            capacity_num_bytes,
            ..Self::default()
        }
    }
}

impl Default for CreateDataPipeOptions {
    fn default() -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            flags: 0,
            element_num_bytes: 1,
            capacity_num_bytes: 0,
        }
    }
}

impl VersionedOptions for CreateDataPipeOptions {
    const FULL_SIZE: u32 = 16;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.element_num_bytes.to_le_bytes());
        out.extend_from_slice(&self.capacity_num_bytes.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        let defaults = Self::default();
        Ok(Self {
            struct_size: declared_size(region),
            flags: read_u32(region, 4).unwrap_or(defaults.flags),
            element_num_bytes: read_u32(region, 8).unwrap_or(defaults.element_num_bytes),
            capacity_num_bytes: read_u32(region, 12).unwrap_or(defaults.capacity_num_bytes),
        })
    }
}

/// Producer-side options of a data pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPipeProducerOptions {
    pub struct_size: u32,
    /// Free space that satisfies WRITE_THRESHOLD; zero means one element
    pub write_threshold_num_bytes: u32,
}

impl DataPipeProducerOptions {
    /// Options with the given write threshold
    pub fn with_threshold(write_threshold_num_bytes: u32) -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            write_threshold_num_bytes,
        }
    }
}

impl Default for DataPipeProducerOptions {
    fn default() -> Self {
        Self::with_threshold(0)
    }
}

impl VersionedOptions for DataPipeProducerOptions {
    const FULL_SIZE: u32 = 8;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.write_threshold_num_bytes.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        Ok(Self {
            struct_size: declared_size(region),
            write_threshold_num_bytes: read_u32(region, 4).unwrap_or(0),
        })
    }
}

/// Consumer-side options of a data pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPipeConsumerOptions {
    pub struct_size: u32,
    /// Readable data that satisfies READ_THRESHOLD; zero means one element
    pub read_threshold_num_bytes: u32,
}

impl DataPipeConsumerOptions {
    /// Options with the given read threshold
    pub fn with_threshold(read_threshold_num_bytes: u32) -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            read_threshold_num_bytes,
        }
    }
}

impl Default for DataPipeConsumerOptions {
    fn default() -> Self {
        Self::with_threshold(0)
    }
}

impl VersionedOptions for DataPipeConsumerOptions {
    const FULL_SIZE: u32 = 8;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.read_threshold_num_bytes.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        Ok(Self {
            struct_size: declared_size(region),
            read_threshold_num_bytes: read_u32(region, 4).unwrap_or(0),
        })
    }
}

/// Options for `create_shared_buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSharedBufferOptions {
    pub struct_size: u32,
    /// Reserved; must be zero
    pub flags: u32,
}

impl Default for CreateSharedBufferOptions {
    fn default() -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            flags: 0,
        }
    }
}

impl VersionedOptions for CreateSharedBufferOptions {
    const FULL_SIZE: u32 = 8;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        Ok(Self {
            struct_size: declared_size(region),
            flags: read_u32(region, 4).unwrap_or(0),
        })
    }
}

/// Options for `duplicate_buffer_handle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateBufferHandleOptions {
    pub struct_size: u32,
    /// Reserved; must be zero
    pub flags: u32,
}

impl Default for DuplicateBufferHandleOptions {
    fn default() -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            flags: 0,
        }
    }
}

impl VersionedOptions for DuplicateBufferHandleOptions {
    const FULL_SIZE: u32 = 8;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        Ok(Self {
            struct_size: declared_size(region),
            flags: read_u32(region, 4).unwrap_or(0),
        })
    }
}

/// Result of `get_buffer_information`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferInformation {
    pub struct_size: u32,
    pub flags: BufferInformationFlags,
    /// Size of the whole shared region
    pub num_bytes: u64,
}

impl BufferInformation {
    /// Information for a region of `num_bytes`
    pub fn new(num_bytes: u64) -> Self {
        Self {
            struct_size: Self::FULL_SIZE,
            flags: BufferInformationFlags::empty(),
            num_bytes,
        }
    }
}

impl Default for BufferInformation {
    fn default() -> Self {
        Self::new(0)
    }
}

impl VersionedOptions for BufferInformation {
    const FULL_SIZE: u32 = 16;

    fn struct_size(&self) -> u32 {
        self.struct_size
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FULL_SIZE as usize);
        out.extend_from_slice(&self.struct_size.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.num_bytes.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> KernelResult<Self> {
        let region = declared_region(bytes, Self::FULL_SIZE)?;
        Ok(Self {
            struct_size: declared_size(region),
            flags: BufferInformationFlags::from_bits_retain(read_u32(region, 4).unwrap_or(0)),
            num_bytes: read_u64(region, 8).unwrap_or(0),
        })
    }
}
