//! Error types for the TRC-8004 core.

use thiserror::Error;

/// Errors produced while parsing a [`ContentReference`](crate::ContentReference).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("empty reference")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing locator after {0}://")]
    MissingLocator(&'static str),

    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("invalid web locator: {0}")]
    InvalidUrl(String),

    #[error("invalid file path: {0}")]
    InvalidPath(String),
}

/// Errors produced while reducing a document to canonical bytes.
///
/// These are raised before any hashing is attempted.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("document is not representable as JSON: {0}")]
    Unsupported(String),

    #[error("document nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("document bytes are not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors produced while parsing a hex commitment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("commitment must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Errors produced while decoding a log entry that matched a known signature.
///
/// Entries that match no signature are skipped and never produce this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{event}: expected {expected} topics, got {got}")]
    TopicCount {
        event: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{event}: data too short for field {field}")]
    DataTooShort {
        event: &'static str,
        field: &'static str,
    },

    #[error("{event}: field {field} overflows a 128-bit integer")]
    IntegerOverflow {
        event: &'static str,
        field: &'static str,
    },

    #[error("{event}: field {field} is not valid UTF-8")]
    InvalidString {
        event: &'static str,
        field: &'static str,
    },

    #[error("{event}: field {field} has an out-of-range offset")]
    BadOffset {
        event: &'static str,
        field: &'static str,
    },
}

impl DecodeError {
    /// The event whose layout failed to decode.
    pub fn event(&self) -> &'static str {
        match self {
            Self::TopicCount { event, .. }
            | Self::DataTooShort { event, .. }
            | Self::IntegerOverflow { event, .. }
            | Self::InvalidString { event, .. }
            | Self::BadOffset { event, .. } => *event,
        }
    }
}
