//! Digests and on-chain commitments.
//!
//! Commitments are Keccak-256 digests written as `0x` + 64 hex characters,
//! the same encoding the registries use for `bytes32` fields. Parsing and
//! comparison are case-insensitive.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::canonical::canonicalize;
use crate::error::{CanonicalError, CommitmentError};
use crate::types::{decode_hex, Word};

/// A 32-byte digest committed to (or checked against) the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DigestCommitment(pub [u8; 32]);

impl DigestCommitment {
    /// The wire prefix.
    pub const PREFIX: &'static str = "0x";

    /// The all-zero commitment. Registries treat it as "no commitment".
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from hex, with or without the `0x` prefix, in any case.
    pub fn parse(s: &str) -> Result<Self, CommitmentError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CommitmentError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Convert to the wire form: `0x` + lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("{}{}", Self::PREFIX, hex::encode(self.0))
    }

    /// Compare against a hex string, ignoring case and prefix.
    ///
    /// Malformed input never matches.
    pub fn matches_hex(&self, s: &str) -> bool {
        Self::parse(s).map(|other| other == *self).unwrap_or(false)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// View as an ABI word.
    pub fn to_word(&self) -> Word {
        Word(self.0)
    }
}

impl fmt::Debug for DigestCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..18])
    }
}

impl fmt::Display for DigestCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DigestCommitment {
    type Err = CommitmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for DigestCommitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for DigestCommitment {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Word> for DigestCommitment {
    fn from(word: Word) -> Self {
        Self(word.0)
    }
}

impl Serialize for DigestCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DigestCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Keccak-256 (the pre-standard SHA-3 variant used by the ledger).
pub fn keccak256(data: &[u8]) -> DigestCommitment {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    DigestCommitment(hasher.finalize().into())
}

/// SHA-256, for callers that need it. Not used for commitments.
pub fn sha256(data: &[u8]) -> DigestCommitment {
    DigestCommitment(Sha256::digest(data).into())
}

/// Hash raw bytes with the commitment hash function.
pub fn hash_bytes(data: &[u8]) -> DigestCommitment {
    keccak256(data)
}

/// Canonicalize a metadata document and hash the result.
pub fn compute_metadata_hash<T: Serialize + ?Sized>(
    document: &T,
) -> Result<DigestCommitment, CanonicalError> {
    let bytes = canonicalize(document)?;
    Ok(hash_bytes(&bytes))
}

/// Lowercase a hash string and strip any `0x` prefix.
pub fn normalize_hash(value: &str) -> String {
    let cleaned = value.trim().to_ascii_lowercase();
    match cleaned.strip_prefix("0x") {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}
