//! Strong type definitions for ledger values.
//!
//! All fixed-width values are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::CommitmentError;

/// A 32-byte ABI word, as carried in log topics and data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word(pub [u8; 32]);

impl Word {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode an unsigned integer as a big-endian word.
    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; 32];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Decode as an unsigned integer, if it fits in 128 bits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Convert to hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
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

    /// The zero word.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Word {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Word {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 21-byte chain address: the network prefix byte followed by the
/// 20-byte account hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 21]);

impl Address {
    /// The mainnet/testnet address prefix byte.
    pub const PREFIX: u8 = 0x41;

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 21]) -> Self {
        Self(bytes)
    }

    /// Lift a 20-byte account hash by prepending [`Address::PREFIX`].
    pub fn from_account(account: [u8; 20]) -> Self {
        let mut out = [0u8; 21];
        out[0] = Self::PREFIX;
        out[1..].copy_from_slice(&account);
        Self(out)
    }

    /// Extract from the low 20 bytes of an ABI word.
    pub fn from_word(word: &Word) -> Self {
        let mut account = [0u8; 20];
        account.copy_from_slice(&word.0[12..]);
        Self::from_account(account)
    }

    /// Encode as a left-padded ABI word.
    pub fn to_word(&self) -> Word {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(self.account());
        Word(out)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// The 20-byte account hash without the prefix.
    pub fn account(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Convert to hex string (42 chars, prefix byte included).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    ///
    /// Accepts the full 21-byte form or a bare 20-byte account hash (as
    /// found in receipt logs), with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let bytes = decode_hex(s)?;
        match bytes.len() {
            21 => {
                let mut arr = [0u8; 21];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }
            20 => {
                let mut account = [0u8; 20];
                account.copy_from_slice(&bytes);
                Ok(Self::from_account(account))
            }
            got => Err(CommitmentError::InvalidLength { expected: 21, got }),
        }
    }

    /// Compare on the account hash only, ignoring the prefix byte.
    pub fn same_account(&self, other: &Address) -> bool {
        self.account() == other.account()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, CommitmentError> {
    let trimmed = s.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| CommitmentError::InvalidHex(e.to_string()))
}
