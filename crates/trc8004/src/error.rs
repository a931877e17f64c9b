//! Error types for the client.

use thiserror::Error;
use trc8004_core::{CanonicalError, CommitmentError, DecodeError, FailureKind, ReferenceError};
use trc8004_fetch::{FetchError, LoadError, UploadError};

use crate::config::ConfigError;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Loading off-chain content failed.
    #[error("load error: {0}")]
    Load(LoadError),

    /// Publishing a document failed.
    #[error("upload error: {0}")]
    Upload(UploadError),

    /// A matching log entry could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The receipt carries no event of the expected kind.
    #[error("expected {event} event not found in receipt")]
    EventNotFound { event: &'static str },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A commitment string is not a valid digest.
    #[error("invalid commitment: {0}")]
    InvalidCommitment(#[from] CommitmentError),

    /// A content reference could not be parsed.
    #[error("invalid reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    /// A document could not be canonicalized.
    #[error("cannot encode document: {0}")]
    Canonical(#[from] CanonicalError),

    /// No upload endpoint is configured.
    #[error("no upload endpoint configured")]
    UploadNotConfigured,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The failure kind, where one applies.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Load(err) => err.kind(),
            Self::InvalidReference(_) => Some(FailureKind::MalformedReference),
            Self::Canonical(_) | Self::Decode(_) => Some(FailureKind::InvalidDocument),
            _ => None,
        }
    }
}

impl From<LoadError> for ClientError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Cancelled => Self::Cancelled,
            other => Self::Load(other),
        }
    }
}

impl From<FetchError> for ClientError {
    fn from(err: FetchError) -> Self {
        LoadError::from(err).into()
    }
}

impl From<UploadError> for ClientError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Cancelled => Self::Cancelled,
            UploadError::NotConfigured => Self::UploadNotConfigured,
            UploadError::Canonical(err) => Self::Canonical(err),
            other => Self::Upload(other),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
