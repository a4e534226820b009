use erd_sensor::ErrorKind;

use crate::codec::Operation;

/// Errors raised while encoding, decoding or transferring frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The operation tag is outside the protocol enumeration.
    #[error("unknown operation tag {0}")]
    UnknownOperation(u32),

    /// The status tag is outside the protocol enumeration.
    #[error("unknown status tag {0}")]
    UnknownStatus(u32),

    /// The time unit tag is outside the protocol enumeration.
    #[error("unknown time unit tag {0}")]
    UnknownTimeUnit(u16),

    /// The energy unit tag is outside the protocol enumeration.
    #[error("unknown energy unit tag {0}")]
    UnknownEnergyUnit(u16),

    /// A value does not fit the internal representation after unit conversion.
    #[error("{0} value out of range after unit conversion")]
    OutOfRange(&'static str),

    /// The frame was handed to the decoder of another operation.
    #[error("expected {expected} frame, got {found}")]
    OperationMismatch {
        expected: Operation,
        found: Operation,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl WireError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WireError::Io(_) | WireError::ConnectionClosed => ErrorKind::System,
            _ => ErrorKind::BadMessage,
        }
    }

    /// True when the stream can no longer carry frames.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::System
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
