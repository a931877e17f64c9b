//! # TRC-8004
//!
//! The unified client API for TRC-8004 agent registries: verified loading
//! of off-chain agent metadata, typed results from ledger receipts, and
//! publishing of metadata documents.
//!
//! ## Overview
//!
//! - **Metadata**: fetched from redundant content-network gateways and
//!   checked against the commitment recorded on-chain
//! - **Receipts**: decoded into typed registry events
//! - **Uploads**: canonical JSON documents published with their commitment
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trc8004::{CancellationToken, ClientConfig, RegistryClient, TransactionReceipt};
//!
//! async fn example(receipt: TransactionReceipt) -> trc8004::Result<()> {
//!     let config = ClientConfig::default().apply_env()?;
//!     let client = RegistryClient::new(config);
//!
//!     let agent_id = client.agent_id_from_receipt(&receipt)?;
//!     let metadata = client
//!         .fetch_agent_metadata(
//!             "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
//!             Some("0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657"),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!     println!("agent {agent_id}: {}", metadata["name"]);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `trc8004::core` - Pure primitives (backoff, hashing, references, events)
//! - `trc8004::fetch` - Gateway fetching, verified loading and uploads

pub mod client;
pub mod config;
pub mod error;

// Re-export component crates
pub use trc8004_core as core;
pub use trc8004_fetch as fetch;

// Re-export main types for convenience
pub use client::{commitment_for, RegistryClient, AGENT_REGISTERED, VALIDATION_REQUESTED};
pub use config::{ClientConfig, ConfigError, ContractAddresses, Network, ENV_GATEWAY, ENV_NETWORK};
pub use error::{ClientError, Result};

// Re-export commonly used component types
pub use trc8004_core::{
    compute_metadata_hash, Address, BackoffPolicy, ContentReference, DecodedEvent,
    DigestCommitment, EventDecoder, TransactionReceipt, Word,
};
pub use trc8004_fetch::{CancellationToken, FetchConfig, Uploaded, Verification};
