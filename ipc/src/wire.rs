//! Structured message headers
//!
//! A structured message is a byte payload that begins with a struct header
//! (`num_bytes`, `version`) followed by the message fields `name` and `flags`
//! and, from version 1 on, a `request_id`. All fields are little-endian.
//!
//! The kernel never looks inside message bytes; these checks run at the edge,
//! on whatever a reader pulls off a message pipe.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of `{num_bytes, version}`
pub const STRUCT_HEADER_SIZE: usize = 8;
/// Size of a version 0 message header
pub const MESSAGE_HEADER_V0_SIZE: usize = 16;
/// Size of a message header carrying a request id
pub const MESSAGE_HEADER_V1_SIZE: usize = 24;

bitflags! {
    /// Message header flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MessageFlags: u32 {
        /// The sender expects a response carrying the same request id
        const EXPECTS_RESPONSE = 1 << 0;
        /// This message answers an earlier request
        const IS_RESPONSE = 1 << 1;
    }
}

/// Header validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Buffer of {0} bytes cannot hold a struct header")]
    HeaderTooSmall(usize),

    #[error("Declared size {num_bytes} is smaller than the minimum {minimum}")]
    NumBytesTooSmall { num_bytes: u32, minimum: u32 },

    #[error("Declared size {num_bytes} exceeds buffer of {buffer_len} bytes")]
    NumBytesExceedsBuffer { num_bytes: u32, buffer_len: usize },

    #[error("Version {version} header must be {expected} bytes, got {num_bytes}")]
    SizeMismatch {
        version: u32,
        num_bytes: u32,
        expected: u32,
    },

    #[error("Version 0 header may not carry flags {0:?}")]
    FlagsWithoutRequestId(MessageFlags),

    #[error("Header cannot both expect a response and be a response")]
    ConflictingFlags,
}

/// Leading header of every encoded struct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructHeader {
    pub num_bytes: u32,
    pub version: u32,
}

impl StructHeader {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.num_bytes.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
    }
}

/// Header of a structured message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub header: StructHeader,
    /// Method ordinal
    pub name: u32,
    pub flags: MessageFlags,
    /// Present from version 1 on
    pub request_id: Option<u64>,
}

impl MessageHeader {
    /// A version 0 fire-and-forget message
    pub fn simple(name: u32) -> Self {
        Self {
            header: StructHeader {
                num_bytes: MESSAGE_HEADER_V0_SIZE as u32,
                version: 0,
            },
            name,
            flags: MessageFlags::empty(),
            request_id: None,
        }
    }

    /// A version 1 request expecting a response
    pub fn request(name: u32, request_id: u64) -> Self {
        Self::with_request_id(name, MessageFlags::EXPECTS_RESPONSE, request_id)
    }

    /// A version 1 response to `request_id`
    pub fn response(name: u32, request_id: u64) -> Self {
        Self::with_request_id(name, MessageFlags::IS_RESPONSE, request_id)
    }

    fn with_request_id(name: u32, flags: MessageFlags, request_id: u64) -> Self {
        Self {
            header: StructHeader {
                num_bytes: MESSAGE_HEADER_V1_SIZE as u32,
                version: 1,
            },
            name,
            flags,
            request_id: Some(request_id),
        }
    }

    pub fn expects_response(&self) -> bool {
        self.flags.contains(MessageFlags::EXPECTS_RESPONSE)
    }

    pub fn is_response(&self) -> bool {
        self.flags.contains(MessageFlags::IS_RESPONSE)
    }

    /// Encodes the header followed by `payload`
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.num_bytes as usize + payload.len());
        self.header.write_to(&mut out);
        out.extend_from_slice(&self.name.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        if let Some(request_id) = self.request_id {
            out.extend_from_slice(&request_id.to_le_bytes());
        }
        // Later versions may declare a larger header than we know how to fill
        out.resize(self.header.num_bytes as usize, 0);
        out.extend_from_slice(payload);
        out
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Validates and decodes the struct header at the start of `bytes`
pub fn validate_struct_header(bytes: &[u8]) -> Result<StructHeader, ValidationError> {
    if bytes.len() < STRUCT_HEADER_SIZE {
        return Err(ValidationError::HeaderTooSmall(bytes.len()));
    }
    let header = StructHeader {
        num_bytes: read_u32(bytes, 0),
        version: read_u32(bytes, 4),
    };
    if (header.num_bytes as usize) < STRUCT_HEADER_SIZE {
        return Err(ValidationError::NumBytesTooSmall {
            num_bytes: header.num_bytes,
            minimum: STRUCT_HEADER_SIZE as u32,
        });
    }
    if header.num_bytes as usize > bytes.len() {
        return Err(ValidationError::NumBytesExceedsBuffer {
            num_bytes: header.num_bytes,
            buffer_len: bytes.len(),
        });
    }
    Ok(header)
}

/// Validates and decodes the message header at the start of `bytes`
pub fn validate_message_header(bytes: &[u8]) -> Result<MessageHeader, ValidationError> {
    let header = validate_struct_header(bytes)?;
    if (header.num_bytes as usize) < MESSAGE_HEADER_V0_SIZE {
        return Err(ValidationError::NumBytesTooSmall {
            num_bytes: header.num_bytes,
            minimum: MESSAGE_HEADER_V0_SIZE as u32,
        });
    }

    let name = read_u32(bytes, 8);
    let flags = MessageFlags::from_bits_retain(read_u32(bytes, 12));

    let request_id = match header.version {
        0 => {
            if header.num_bytes as usize != MESSAGE_HEADER_V0_SIZE {
                return Err(ValidationError::SizeMismatch {
                    version: 0,
                    num_bytes: header.num_bytes,
                    expected: MESSAGE_HEADER_V0_SIZE as u32,
                });
            }
            if flags.intersects(MessageFlags::EXPECTS_RESPONSE | MessageFlags::IS_RESPONSE) {
                return Err(ValidationError::FlagsWithoutRequestId(flags));
            }
            None
        }
        version => {
            let size_ok = if version == 1 {
                header.num_bytes as usize == MESSAGE_HEADER_V1_SIZE
            } else {
                header.num_bytes as usize >= MESSAGE_HEADER_V1_SIZE
            };
            if !size_ok {
                return Err(ValidationError::SizeMismatch {
                    version,
                    num_bytes: header.num_bytes,
                    expected: MESSAGE_HEADER_V1_SIZE as u32,
                });
            }
            Some(read_u64(bytes, 16))
        }
    };

    if flags.contains(MessageFlags::EXPECTS_RESPONSE | MessageFlags::IS_RESPONSE) {
        return Err(ValidationError::ConflictingFlags);
    }

    Ok(MessageHeader {
        header,
        name,
        flags,
        request_id,
    })
}

/// Splits a message into its validated header and payload
pub fn decode_message(bytes: &[u8]) -> Result<(MessageHeader, &[u8]), ValidationError> {
    let header = validate_message_header(bytes)?;
    Ok((header, &bytes[header.header.num_bytes as usize..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fields: &[u32]) -> Vec<u8> {
        fields.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    #[test]
    fn test_struct_header_too_small() {
        assert_eq!(
            validate_struct_header(&[0; 4]),
            Err(ValidationError::HeaderTooSmall(4))
        );
    }

    #[test]
    fn test_struct_header_num_bytes_too_small() {
        let mut bytes = raw(&[1, 0]);
        bytes.resize(16, 0);
        assert!(matches!(
            validate_struct_header(&bytes),
            Err(ValidationError::NumBytesTooSmall { num_bytes: 1, .. })
        ));
    }

    #[test]
    fn test_struct_header_bigger_than_buffer() {
        let mut bytes = raw(&[20, 0]);
        bytes.resize(16, 0);
        assert!(matches!(
            validate_struct_header(&bytes),
            Err(ValidationError::NumBytesExceedsBuffer { num_bytes: 20, .. })
        ));
    }

    #[test]
    fn test_valid_struct_header() {
        let mut bytes = raw(&[16, 0]);
        bytes.resize(16, 0);
        let header = validate_struct_header(&bytes).unwrap();
        assert_eq!(header.num_bytes, 16);
        assert_eq!(header.version, 0);
    }

    #[test]
    fn test_message_header_num_bytes_too_small() {
        let mut bytes = raw(&[8, 0]);
        bytes.resize(16, 0);
        assert!(validate_message_header(&bytes).is_err());
    }

    #[test]
    fn test_version_0_with_version_1_size() {
        let bytes = raw(&[24, 0, 1, 0, 0, 0]);
        assert!(matches!(
            validate_message_header(&bytes),
            Err(ValidationError::SizeMismatch { version: 0, .. })
        ));
    }

    #[test]
    fn test_version_1_with_version_0_size() {
        let bytes = raw(&[16, 1, 1, 0, 0]);
        assert!(matches!(
            validate_message_header(&bytes),
            Err(ValidationError::SizeMismatch { version: 1, .. })
        ));
    }

    #[test]
    fn test_version_0_rejects_response_flags() {
        for flags in [1, 2, 3] {
            let bytes = raw(&[16, 0, 1, flags]);
            assert!(validate_message_header(&bytes).is_err(), "flags {}", flags);
        }
    }

    #[test]
    fn test_version_1_rejects_both_flags() {
        let bytes = raw(&[24, 1, 1, 3, 1, 0]);
        assert_eq!(
            validate_message_header(&bytes),
            Err(ValidationError::ConflictingFlags)
        );
    }

    #[test]
    fn test_valid_message_headers() {
        let v0 = validate_message_header(&raw(&[16, 0, 1, 0])).unwrap();
        assert_eq!(v0.request_id, None);

        let request = validate_message_header(&raw(&[24, 1, 2, 1, 7, 0])).unwrap();
        assert!(request.expects_response());
        assert_eq!(request.request_id, Some(7));

        let response = validate_message_header(&raw(&[24, 1, 3, 2, 9, 0])).unwrap();
        assert!(response.is_response());

        let plain = validate_message_header(&raw(&[24, 1, 3, 0, 1, 0])).unwrap();
        assert!(plain.flags.is_empty());
    }

    #[test]
    fn test_later_version_allows_larger_header() {
        let bytes = raw(&[32, 2, 4, 0, 5, 0, 0, 0]);
        let header = validate_message_header(&bytes).unwrap();
        assert_eq!(header.header.version, 2);
        assert_eq!(header.request_id, Some(5));
    }

    #[test]
    fn test_encode_then_decode_with_payload() {
        let encoded = MessageHeader::request(42, 1234).encode(b"hello");
        let (header, payload) = decode_message(&encoded).unwrap();
        assert_eq!(header.name, 42);
        assert_eq!(header.request_id, Some(1234));
        assert_eq!(payload, b"hello");

        let simple = MessageHeader::simple(5).encode(&[]);
        assert_eq!(simple.len(), MESSAGE_HEADER_V0_SIZE);
        assert_eq!(decode_message(&simple).unwrap().0, MessageHeader::simple(5));
    }
}
