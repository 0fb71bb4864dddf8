//! Error taxonomy shared by the hasher, the store, and the C boundary.
//! Every variant maps to one stable status code; hosts branch on those codes,
//! so the numbers below must never be reassigned.

use thiserror::Error;

pub const STATUS_OK: i32 = 0;
/// Non-error negative answer: wrong password on verify, rehash needed on
/// `joinly_needs_rehash`.
pub const STATUS_MISMATCH: i32 = 1;
pub const STATUS_INVALID_INPUT: i32 = -1;
pub const STATUS_NOT_FOUND: i32 = -2;
pub const STATUS_ENCODING_OVERFLOW: i32 = -3;
pub const STATUS_MALFORMED_RECORD: i32 = -4;
pub const STATUS_UNSUPPORTED_ALGORITHM: i32 = -5;
pub const STATUS_INTERNAL_ERROR: i32 = -6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found")]
    NotFound,
    #[error("output buffer too small; {required} bytes required")]
    EncodingOverflow { required: usize },
    #[error("malformed hash record: {0}")]
    MalformedRecord(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl NativeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        NativeError::InvalidInput(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        NativeError::MalformedRecord(msg.into())
    }

    /// Integer status returned across the C boundary for this error.
    pub fn status(&self) -> i32 {
        match self {
            NativeError::InvalidInput(_) => STATUS_INVALID_INPUT,
            NativeError::NotFound => STATUS_NOT_FOUND,
            NativeError::EncodingOverflow { .. } => STATUS_ENCODING_OVERFLOW,
            NativeError::MalformedRecord(_) => STATUS_MALFORMED_RECORD,
            NativeError::UnsupportedAlgorithm(_) => STATUS_UNSUPPORTED_ALGORITHM,
            NativeError::Internal(_) => STATUS_INTERNAL_ERROR,
        }
    }
}
