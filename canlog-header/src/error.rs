use thiserror::Error;

/// Result type for header decoding
pub type FormatResult<T> = Result<T, FormatError>;

/// Reasons a header fails to decode. Every variant carries the absolute byte
/// offset it was raised at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Header truncated reading {field} at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: u64,
        needed: usize,
        available: u64,
    },

    #[error("{block} pointer {pointer:#x} at offset {offset} is outside the file ({len} bytes)")]
    PointerOutOfBounds {
        block: &'static str,
        offset: u64,
        pointer: u64,
        len: u64,
    },

    #[error("Field {field} at offset {offset} is not ASCII")]
    InvalidAscii { field: &'static str, offset: u64 },

    #[error("Recording date {date:?} and time {time:?} do not form a valid timestamp")]
    InvalidTimestamp { date: String, time: String },

    #[error("Expected {expected} block at offset {offset}, found {found:?}")]
    UnexpectedBlock {
        expected: &'static str,
        found: String,
        offset: u64,
    },

    #[error("I/O error at offset {offset}: {message}")]
    Io { offset: u64, message: String },
}

impl FormatError {
    pub fn truncated(field: &'static str, offset: u64, needed: usize, available: u64) -> Self {
        Self::Truncated {
            field,
            offset,
            needed,
            available,
        }
    }

    pub fn pointer_out_of_bounds(block: &'static str, offset: u64, pointer: u64, len: u64) -> Self {
        Self::PointerOutOfBounds {
            block,
            offset,
            pointer,
            len,
        }
    }

    pub fn invalid_ascii(field: &'static str, offset: u64) -> Self {
        Self::InvalidAscii { field, offset }
    }

    /// Byte offset the error was raised at, when it has one
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Truncated { offset, .. }
            | Self::PointerOutOfBounds { offset, .. }
            | Self::InvalidAscii { offset, .. }
            | Self::UnexpectedBlock { offset, .. }
            | Self::Io { offset, .. } => Some(*offset),
            Self::InvalidTimestamp { .. } => None,
        }
    }
}
