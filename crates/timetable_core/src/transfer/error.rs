//! Error types for the transfer pipeline.
//!
//! Every variant is scoped to one transfer and recoverable by resetting the
//! receiving session; none of them is fatal to the process.

use crate::ports::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Scanned text is not a `part/total:fragment` frame
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A frame's total disagrees with the transfer already in progress
    #[error("frame belongs to a different transfer: expected {expected} parts, got {actual}")]
    SessionMismatch { expected: u32, actual: u32 },

    /// Base64, inflate or JSON syntax failure on a complete set of frames
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Well-formed data with missing fields or unusable references
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] PortError),
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;
