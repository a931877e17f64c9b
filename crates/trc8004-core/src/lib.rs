//! # TRC-8004 Core
//!
//! Pure primitives for TRC-8004 registry clients: retry policy, content
//! references, canonical hashing, and ledger event decoding.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over untrusted inputs fetched by the layers above it.
//!
//! ## Key Types
//!
//! - [`BackoffPolicy`] / [`BackoffState`] - Retry decisions and wait durations
//! - [`FailureKind`] - Transient vs. permanent failure taxonomy
//! - [`ContentReference`] - Parsed `ipfs://`, `https://` or `file://` locator
//! - [`DigestCommitment`] - 32-byte hash in the ledger's `0x` hex wire format
//! - [`TransactionReceipt`] - Read-only view of a confirmed transaction's logs
//! - [`EventDecoder`] - Turns receipt logs into typed [`DecodedEvent`]s
//!
//! ## Canonicalization
//!
//! Metadata documents are hashed over canonical JSON. See [`canonical`] module.

pub mod backoff;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod event;
pub mod failure;
pub mod receipt;
pub mod reference;
pub mod types;

pub use backoff::{BackoffPolicy, BackoffState, Decision, GiveUpReason};
pub use canonical::{
    canonical_bytes, canonical_string, canonicalize, canonicalize_json_bytes, parse_json,
};
pub use digest::{
    compute_metadata_hash, hash_bytes, keccak256, normalize_hash, sha256, DigestCommitment,
};
pub use error::{CanonicalError, CommitmentError, DecodeError, ReferenceError};
pub use event::{
    DecodedEvent, DecodedEvents, DecodedValue, EventDecoder, EventParam, EventSignature,
    ParamKind, KNOWN_EVENTS,
};
pub use failure::FailureKind;
pub use receipt::{LogEntry, ReceiptEvent, TransactionReceipt};
pub use reference::{BackendKind, ContentReference, Scheme};
pub use types::{Address, Word};
