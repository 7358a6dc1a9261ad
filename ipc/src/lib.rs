//! # Inter-Process Communication (IPC)
//!
//! Structured-message framing for payloads carried over message pipes.
//!
//! ## Philosophy
//!
//! - **The kernel moves bytes, not meaning**: pipes never inspect payloads
//! - **Validate at the edge**: readers check headers before trusting them
//! - **Versionable**: newer header versions may grow, older readers still parse them
//!
//! ## Architecture
//!
//! Every structured message starts with a header carrying:
//! - Its own size and version
//! - A method ordinal (`name`)
//! - Request/response flags
//! - A request id for request/response matching (version 1 and later)

pub mod wire;

pub use wire::{
    decode_message, validate_message_header, validate_struct_header, MessageFlags, MessageHeader,
    StructHeader, ValidationError, MESSAGE_HEADER_V0_SIZE, MESSAGE_HEADER_V1_SIZE,
    STRUCT_HEADER_SIZE,
};
