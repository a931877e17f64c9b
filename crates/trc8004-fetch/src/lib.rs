//! # TRC-8004 Fetch
//!
//! Resilient retrieval of off-chain content for TRC-8004 clients.
//!
//! ## Overview
//!
//! Agent metadata and validation payloads live in a content-addressed
//! network reachable only through public gateways that may be slow, rate
//! limited or down. This crate turns a [`ContentReference`] into trusted
//! bytes:
//!
//! - [`GatewayFetcher`] tries each candidate backend in order, retrying
//!   transient failures under a [`BackoffPolicy`] per candidate
//! - [`VerifiedLoader`] checks fetched content against an on-chain commitment
//! - [`ContentUploader`] publishes canonical JSON documents
//!
//! Every operation takes a [`CancellationToken`]; cancellation is reported
//! as its own outcome and never as a fetch failure.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use trc8004_fetch::{FetchConfig, VerifiedLoader, Verification};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = VerifiedLoader::new(FetchConfig::default());
//!     let expected = Verification::canonical(
//!         "0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657",
//!     )?;
//!
//!     let loaded = loader
//!         .load_uri("ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG", expected, &CancellationToken::new())
//!         .await?;
//!     println!("{}", loaded.json()?);
//!     Ok(())
//! }
//! ```
//!
//! [`ContentReference`]: trc8004_core::ContentReference
//! [`BackoffPolicy`]: trc8004_core::BackoffPolicy

pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod transport;
pub mod upload;

pub use config::{FetchConfig, DEFAULT_GATEWAYS};
pub use error::{AttemptFailure, CandidateFailure, FetchError, LoadError, Result, UploadError};
pub use fetcher::{AttemptOutcome, Candidate, FetchAttempt, Fetched, GatewayFetcher};
pub use loader::{Loaded, Verification, VerifiedLoader};
pub use tokio_util::sync::CancellationToken;
pub use transport::{
    memory::MemoryHttpClient, memory::RecordedRequest, memory::Scripted, HttpClient, HttpResponse,
    ReqwestHttpClient,
};
pub use upload::{ContentUploader, Uploaded};
