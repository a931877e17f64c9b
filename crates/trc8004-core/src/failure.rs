//! Failure classification for network and storage attempts.
//!
//! Every failed attempt is reduced to a [`FailureKind`]. The kind alone
//! decides retry eligibility: transient kinds may succeed if the same request
//! is repeated, permanent kinds will not.

use std::fmt;

/// The kind of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    // Transient
    /// The attempt did not complete within its time bound.
    Timeout,
    /// The remote end refused the connection.
    ConnectionRefused,
    /// The remote end could not be reached at all (DNS, routing, TLS).
    Unreachable,
    /// The remote end asked us to slow down (HTTP 429).
    RateLimited,
    /// Server-side temporary failure (HTTP 5xx).
    ServerError(u16),
    /// The payload ended before its declared length.
    Truncated,

    // Permanent
    /// The reference could not be parsed or routed.
    MalformedReference,
    /// The content does not exist at this backend (HTTP 404, missing file).
    NotFound,
    /// Authentication or authorization was rejected (HTTP 401/403).
    Unauthorized(u16),
    /// Any other request-side rejection (HTTP 4xx).
    ClientError(u16),
    /// Local filesystem error other than not-found or permission.
    Io,
    /// Fetched bytes did not match the expected commitment.
    VerificationFailed,
    /// The document could not be canonicalized.
    InvalidDocument,
}

impl FailureKind {
    /// Whether repeating the same request might succeed.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectionRefused
                | Self::Unreachable
                | Self::RateLimited
                | Self::ServerError(_)
                | Self::Truncated
        )
    }

    /// Whether this failure will recur for the same request.
    pub fn is_permanent(self) -> bool {
        !self.is_transient()
    }

    /// Classify an HTTP status code.
    ///
    /// Returns `None` for non-error statuses (below 400).
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            0..=399 => None,
            401 | 403 => Some(Self::Unauthorized(status)),
            404 | 410 => Some(Self::NotFound),
            408 => Some(Self::Timeout),
            429 => Some(Self::RateLimited),
            400..=499 => Some(Self::ClientError(status)),
            _ => Some(Self::ServerError(status)),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::ServerError(status) => write!(f, "server error ({status})"),
            Self::Truncated => write!(f, "truncated payload"),
            Self::MalformedReference => write!(f, "malformed reference"),
            Self::NotFound => write!(f, "not found"),
            Self::Unauthorized(status) => write!(f, "unauthorized ({status})"),
            Self::ClientError(status) => write!(f, "client error ({status})"),
            Self::Io => write!(f, "i/o error"),
            Self::VerificationFailed => write!(f, "verification failed"),
            Self::InvalidDocument => write!(f, "invalid document"),
        }
    }
}
