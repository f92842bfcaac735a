//! Wire decoding errors

use fedpro_core::RtiError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("invalid packet size {0}")]
    InvalidPacketSize(u32),

    #[error("unknown message type {0}")]
    UnknownMessageType(u32),

    #[error("unexpected message type {0}")]
    UnexpectedMessageType(&'static str),

    #[error("bad message body: {0}")]
    BadMessage(String),
}

pub type WireResult<T> = Result<T, WireError>;

impl From<RtiError> for WireError {
    fn from(e: RtiError) -> Self {
        WireError::BadMessage(e.details().to_string())
    }
}

impl From<WireError> for RtiError {
    fn from(e: WireError) -> Self {
        RtiError::CouldNotDecode(e.to_string())
    }
}
