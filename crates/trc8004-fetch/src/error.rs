//! Error types for fetching, loading and uploading.

use std::fmt;

use thiserror::Error;
use trc8004_core::{CanonicalError, DigestCommitment, FailureKind, ReferenceError};

/// Why a single attempt against one backend failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// The terminal failure of one candidate backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Backend identifier (gateway base URL, web URL or file path).
    pub backend: String,
    /// The last failure seen on this backend.
    pub failure: AttemptFailure,
    /// Attempts made against this backend.
    pub attempts: u32,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.backend, self.attempts, self.failure
        )
    }
}

/// Errors from [`GatewayFetcher`](crate::GatewayFetcher).
///
/// A lone candidate surfaces as [`Failed`](Self::Failed), several as
/// [`Aggregate`](Self::Aggregate). Use [`failures`](Self::failures) to read
/// either shape.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The reference could not be parsed.
    #[error("invalid reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    /// No backend is configured for the reference's scheme.
    #[error("no backends configured for {0}")]
    NoCandidates(String),

    /// The only candidate failed.
    #[error("{0}")]
    Failed(CandidateFailure),

    /// Every candidate failed. Carries the last failure of each, in order.
    #[error("all {} candidates failed: {}", .0.len(), join(.0))]
    Aggregate(Vec<CandidateFailure>),

    /// The caller cancelled the fetch.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Per-candidate failures, in the order the candidates were tried.
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            Self::Failed(failure) => std::slice::from_ref(failure),
            Self::Aggregate(failures) => failures,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn join(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from [`VerifiedLoader`](crate::VerifiedLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    /// Fetching failed. Never carries [`FetchError::Cancelled`].
    #[error("fetch failed: {0}")]
    Fetch(FetchError),

    /// The caller cancelled the load.
    #[error("load cancelled")]
    Cancelled,

    /// The fetched content does not match its commitment.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    Verification {
        expected: DigestCommitment,
        actual: DigestCommitment,
    },

    /// The fetched content is not a valid document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl LoadError {
    /// The failure kind, for callers that branch on the taxonomy.
    ///
    /// Returns `None` for cancellation and aggregate fetch failures.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Fetch(FetchError::Failed(failure)) => Some(failure.failure.kind),
            Self::Fetch(FetchError::InvalidReference(_)) => Some(FailureKind::MalformedReference),
            Self::Fetch(_) | Self::Cancelled => None,
            Self::Verification { .. } => Some(FailureKind::VerificationFailed),
            Self::InvalidDocument(_) => Some(FailureKind::InvalidDocument),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => Self::Cancelled,
            other => Self::Fetch(other),
        }
    }
}

impl From<CanonicalError> for LoadError {
    fn from(err: CanonicalError) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

/// Errors from [`ContentUploader`](crate::ContentUploader).
#[derive(Debug, Error)]
pub enum UploadError {
    /// No upload endpoint is configured.
    #[error("no upload endpoint configured")]
    NotConfigured,

    /// The document could not be canonicalized.
    #[error("cannot encode document: {0}")]
    Canonical(#[from] CanonicalError),

    /// The upload endpoint failed.
    #[error("upload failed: {0}")]
    Failed(CandidateFailure),

    /// The endpoint answered without a usable content identifier.
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),

    /// The caller cancelled the upload.
    #[error("upload cancelled")]
    Cancelled,
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
