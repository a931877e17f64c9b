//! # TRC-8004 Testkit
//!
//! Testing utilities for TRC-8004 clients.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical forms and commitments every client must reproduce
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: ABI-encoded receipt logs and scripted gateway setups
//!
//! ## Golden Vectors
//!
//! ```rust
//! use trc8004_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed, detail) in verify_all_vectors() {
//!     assert!(passed, "{name}: {detail}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use trc8004_core::canonicalize_json_bytes;
//! use trc8004_testkit::generators::{json_value, render_shuffled};
//!
//! proptest! {
//!     #[test]
//!     fn key_order_is_irrelevant(value in json_value(), seed: u64) {
//!         let a = canonicalize_json_bytes(render_shuffled(&value, seed).as_bytes()).unwrap();
//!         let b = canonicalize_json_bytes(value.to_string().as_bytes()).unwrap();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use trc8004_core::{Address, EventDecoder};
//! use trc8004_testkit::fixtures::{agent_registered, receipt};
//!
//! let contract = Address::from_account([0x11; 20]);
//! let owner = Address::from_account([0x22; 20]);
//! let receipt = receipt(vec![agent_registered(contract, 42, owner, "ipfs://QmA")]);
//!
//! let event = EventDecoder::standard().decode(&receipt, None).next().unwrap().unwrap();
//! assert_eq!(event.uint("agentId"), Some(42));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{agent_registered, encode_log, receipt, validation_requested, GatewayFixture};
pub use generators::{json_value, render_shuffled};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector, TOPIC_VECTORS};
