//! Kernel error types
//!
//! Every operation reports failure with one of a fixed set of result codes.
//! `0` is success and never appears as an error; the remaining codes map
//! one-to-one onto [`KernelError`] variants.

use core_types::SignalsState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result code reported on success
pub const RESULT_OK: u32 = 0;

/// Errors that can occur when interacting with the kernel
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelError {
    /// The operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Unknown failure
    #[error("Unknown error")]
    Unknown,

    /// A handle or argument was invalid
    #[error("Invalid argument")]
    InvalidArgument,

    /// The deadline passed before the operation completed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Requested entity was not found
    #[error("Not found")]
    NotFound,

    /// Entity already exists
    #[error("Already exists")]
    AlreadyExists,

    /// Caller lacks the required rights
    #[error("Permission denied")]
    PermissionDenied,

    /// A limit was reached or a buffer was too small
    #[error("Resource exhausted")]
    ResourceExhausted,

    /// The resource is not in a state that allows the operation
    #[error("Failed precondition")]
    FailedPrecondition,

    /// The operation was aborted
    #[error("Aborted")]
    Aborted,

    /// The request cannot be satisfied with the available amount
    #[error("Out of range")]
    OutOfRange,

    /// The operation is not implemented
    #[error("Unimplemented")]
    Unimplemented,

    /// Internal invariant violated
    #[error("Internal error")]
    Internal,

    /// The resource is temporarily unavailable
    #[error("Unavailable")]
    Unavailable,

    /// Unrecoverable data loss
    #[error("Data loss")]
    DataLoss,

    /// The resource is in use by another operation
    #[error("Busy")]
    Busy,

    /// The operation would block; wait for a signal and retry
    #[error("Should wait")]
    ShouldWait,
}

/// Convenience alias used throughout the kernel
pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Returns the numeric result code
    pub const fn code(&self) -> u32 {
        match self {
            KernelError::Cancelled => 1,
            KernelError::Unknown => 2,
            KernelError::InvalidArgument => 3,
            KernelError::DeadlineExceeded => 4,
            KernelError::NotFound => 5,
            KernelError::AlreadyExists => 6,
            KernelError::PermissionDenied => 7,
            KernelError::ResourceExhausted => 8,
            KernelError::FailedPrecondition => 9,
            KernelError::Aborted => 10,
            KernelError::OutOfRange => 11,
            KernelError::Unimplemented => 12,
            KernelError::Internal => 13,
            KernelError::Unavailable => 14,
            KernelError::DataLoss => 15,
            KernelError::Busy => 16,
            KernelError::ShouldWait => 17,
        }
    }

    /// Maps a numeric result code back to an error
    ///
    /// Returns `None` for [`RESULT_OK`] and for codes outside the fixed set.
    pub const fn from_code(code: u32) -> Option<Self> {
        let error = match code {
            1 => KernelError::Cancelled,
            2 => KernelError::Unknown,
            3 => KernelError::InvalidArgument,
            4 => KernelError::DeadlineExceeded,
            5 => KernelError::NotFound,
            6 => KernelError::AlreadyExists,
            7 => KernelError::PermissionDenied,
            8 => KernelError::ResourceExhausted,
            9 => KernelError::FailedPrecondition,
            10 => KernelError::Aborted,
            11 => KernelError::OutOfRange,
            12 => KernelError::Unimplemented,
            13 => KernelError::Internal,
            14 => KernelError::Unavailable,
            15 => KernelError::DataLoss,
            16 => KernelError::Busy,
            17 => KernelError::ShouldWait,
            _ => return None,
        };
        Some(error)
    }
}

/// Converts an operation result into its numeric result code
pub fn result_code<T>(result: &KernelResult<T>) -> u32 {
    match result {
        Ok(_) => RESULT_OK,
        Err(error) => error.code(),
    }
}

/// Failure of a single-handle wait
///
/// `signals_state` is reported whenever the handle was valid at the time the
/// wait finished; it is `None` for an invalid handle and empty when the handle
/// was closed out from under the wait.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait failed: {error}")]
pub struct WaitError {
    /// Why the wait ended
    pub error: KernelError,
    /// The handle's state when the wait ended
    pub signals_state: Option<SignalsState>,
}

impl WaitError {
    /// Creates a wait error without a state
    pub fn new(error: KernelError) -> Self {
        Self {
            error,
            signals_state: None,
        }
    }

    /// Creates a wait error carrying the handle's state
    pub fn with_state(error: KernelError, signals_state: SignalsState) -> Self {
        Self {
            error,
            signals_state: Some(signals_state),
        }
    }
}

impl From<KernelError> for WaitError {
    fn from(error: KernelError) -> Self {
        Self::new(error)
    }
}

/// Successful completion of a multi-handle wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitManyResult {
    /// Index of the handle whose signals were satisfied
    pub index: usize,
    /// State of every handle, in argument order
    pub signals_states: Vec<SignalsState>,
}

/// Failure of a multi-handle wait
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("wait_many failed: {error}")]
pub struct WaitManyError {
    /// Why the wait ended
    pub error: KernelError,
    /// Index of the offending handle, when one is responsible
    pub index: Option<usize>,
    /// State of every handle, when all handles were valid
    pub signals_states: Option<Vec<SignalsState>>,
}

impl WaitManyError {
    /// Creates an error for a malformed call
    pub fn new(error: KernelError) -> Self {
        Self {
            error,
            index: None,
            signals_states: None,
        }
    }

    /// Creates an error naming the offending handle
    pub fn at_index(error: KernelError, index: usize) -> Self {
        Self {
            error,
            index: Some(index),
            signals_states: None,
        }
    }
}

/// Byte and handle counts of a queued message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageSizes {
    /// Message payload size
    pub num_bytes: usize,
    /// Number of attached handles
    pub num_handles: usize,
}

/// Failure of a message read
///
/// When the caller's buffers are too small the error is
/// [`KernelError::ResourceExhausted`] and `required` carries the sizes of the
/// message at the head of the queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("read_message failed: {error}")]
pub struct ReadMessageError {
    /// Why the read failed
    pub error: KernelError,
    /// Sizes needed to read the head message
    pub required: Option<MessageSizes>,
}

impl ReadMessageError {
    /// Creates a read error without size information
    pub fn new(error: KernelError) -> Self {
        Self {
            error,
            required: None,
        }
    }

    /// Creates a too-small error carrying the needed sizes
    pub fn too_small(required: MessageSizes) -> Self {
        Self {
            error: KernelError::ResourceExhausted,
            required: Some(required),
        }
    }
}

impl From<KernelError> for ReadMessageError {
    fn from(error: KernelError) -> Self {
        Self::new(error)
    }
}
