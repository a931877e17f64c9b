//! The registry client: glue between configuration, loading and decoding.
//!
//! Everything here is a thin composition of the component crates. The
//! client adds the policy decisions that belong one layer above them:
//! which hashing mode applies to which kind of content, what a zero
//! commitment means, and when an absent event is an error.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use trc8004_core::{
    compute_metadata_hash, Address, ContentReference, DecodedEvent, DecodedEvents,
    DigestCommitment, EventDecoder, TransactionReceipt, Word,
};
use trc8004_fetch::{
    CancellationToken, ContentUploader, GatewayFetcher, HttpClient, ReqwestHttpClient, Uploaded,
    Verification, VerifiedLoader,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Event emitted by the identity registry on registration.
pub const AGENT_REGISTERED: &str = "AgentRegistered";

/// Event emitted by the validation registry on a new request.
pub const VALIDATION_REQUESTED: &str = "ValidationRequested";

/// A TRC-8004 registry client.
///
/// Provides:
/// - Verified loading of agent metadata and validation payloads
/// - Typed results from write-transaction receipts
/// - Publishing metadata documents
#[derive(Debug, Clone)]
pub struct RegistryClient<C = ReqwestHttpClient> {
    config: ClientConfig,
    loader: VerifiedLoader<C>,
    uploader: Option<ContentUploader<C>>,
    decoder: EventDecoder,
}

impl RegistryClient<ReqwestHttpClient> {
    /// Create a client backed by a fresh `reqwest` client.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(ReqwestHttpClient::new(), config)
    }
}

impl<C: HttpClient + Clone> RegistryClient<C> {
    /// Create a client over `client`. Loader and uploader share it.
    pub fn with_client(client: C, config: ClientConfig) -> Self {
        let uploader = ContentUploader::from_config(client.clone(), &config.fetch).ok();
        let loader = VerifiedLoader::from_fetcher(GatewayFetcher::with_client(
            client,
            config.fetch.clone(),
        ));

        info!(
            network = %config.network,
            rpc = config.rpc_url(),
            gateways = config.fetch.gateways.len(),
            uploads = uploader.is_some(),
            "registry client ready"
        );

        Self {
            config,
            loader,
            uploader,
            decoder: EventDecoder::standard(),
        }
    }

    /// Replace the event decoder.
    pub fn with_decoder(mut self, decoder: EventDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn loader(&self) -> &VerifiedLoader<C> {
        &self.loader
    }

    pub fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Off-chain content
    // ─────────────────────────────────────────────────────────────────────────

    /// Load an agent's metadata document.
    ///
    /// When `expected_hash` is given and non-zero, the document's canonical
    /// hash must match it.
    pub async fn fetch_agent_metadata(
        &self,
        uri: &str,
        expected_hash: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let reference = ContentReference::parse_lenient(uri)?;
        let verification = match expected_commitment(expected_hash)? {
            Some(expected) => Verification::CanonicalJson(expected),
            None => Verification::None,
        };

        let loaded = self.loader.load(&reference, verification, cancel).await?;
        Ok(loaded.json()?)
    }

    /// Load a validation request or response payload as text.
    ///
    /// When `expected_hash` is given and non-zero, the payload must be JSON
    /// whose canonical hash matches it, the same commitment
    /// [`commitment_for`] produces.
    pub async fn load_request_data(
        &self,
        uri: &str,
        expected_hash: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let reference = ContentReference::parse_lenient(uri)?;
        let verification = match expected_commitment(expected_hash)? {
            Some(expected) => Verification::CanonicalJson(expected),
            None => Verification::None,
        };

        let loaded = self.loader.load(&reference, verification, cancel).await?;
        Ok(loaded.text()?.to_string())
    }

    /// Publish a metadata document.
    ///
    /// The returned digest is the commitment to record on-chain.
    pub async fn upload_metadata<T: Serialize + ?Sized>(
        &self,
        document: &T,
        cancel: &CancellationToken,
    ) -> Result<Uploaded> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or(ClientError::UploadNotConfigured)?;
        let uploaded = uploader.upload(document, cancel).await?;
        debug!(reference = %uploaded.reference, digest = %uploaded.digest, "metadata published");
        Ok(uploaded)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Receipts
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode every known event in `receipt`.
    pub fn events<'a>(
        &'a self,
        receipt: &'a TransactionReceipt,
        contract: Option<&'a Address>,
    ) -> DecodedEvents<'a> {
        self.decoder.decode(receipt, contract)
    }

    /// The agent id assigned by a registration transaction.
    ///
    /// Falls back to the receipt's node-decoded `events` when no log
    /// decodes, reading `agentId` or `agent_id`.
    pub fn agent_id_from_receipt(&self, receipt: &TransactionReceipt) -> Result<u128> {
        let not_found = ClientError::EventNotFound {
            event: AGENT_REGISTERED,
        };
        match self.expect_event(
            receipt,
            self.config.contracts.identity.as_ref(),
            AGENT_REGISTERED,
        ) {
            Ok(event) => event.uint("agentId").ok_or(not_found),
            Err(ClientError::EventNotFound { .. }) => {
                let event = receipt.decoded_event(AGENT_REGISTERED).ok_or(not_found)?;
                debug!(event = AGENT_REGISTERED, "using node-decoded receipt event");
                event
                    .uint("agentId")
                    .or_else(|| event.uint("agent_id"))
                    .ok_or(ClientError::EventNotFound {
                        event: AGENT_REGISTERED,
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// The request id assigned by a validation-request transaction.
    pub fn validation_request_id_from_receipt(&self, receipt: &TransactionReceipt) -> Result<Word> {
        let event = self.expect_event(
            receipt,
            self.config.contracts.validation.as_ref(),
            VALIDATION_REQUESTED,
        )?;
        event
            .hash("requestId")
            .copied()
            .ok_or(ClientError::EventNotFound {
                event: VALIDATION_REQUESTED,
            })
    }

    fn expect_event(
        &self,
        receipt: &TransactionReceipt,
        contract: Option<&Address>,
        event: &'static str,
    ) -> Result<DecodedEvent> {
        match self.decoder.decode(receipt, contract).first_named(event) {
            Some(result) => Ok(result?),
            None => Err(ClientError::EventNotFound { event }),
        }
    }
}

/// Parse an optional commitment. A zero commitment means "none recorded".
fn expected_commitment(hex: Option<&str>) -> Result<Option<DigestCommitment>> {
    let Some(hex) = hex.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let commitment = DigestCommitment::parse(hex)?;
    Ok((!commitment.is_zero()).then_some(commitment))
}

/// The commitment for optional request, result or reason data.
///
/// Absent data commits to [`DigestCommitment::ZERO`].
pub fn commitment_for(data: Option<&Value>) -> Result<DigestCommitment> {
    match data {
        Some(value) => Ok(compute_metadata_hash(value)?),
        None => Ok(DigestCommitment::ZERO),
    }
}
