//! Fetch-then-verify loading.
//!
//! The loader never infers how content should be hashed. Callers choose
//! with [`Verification`]: no check, a hash of the raw bytes, or a hash of the
//! canonical JSON form. Content that fails its check is dropped.

use bytes::Bytes;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trc8004_core::{
    canonical_bytes, hash_bytes, CommitmentError, ContentReference, DigestCommitment,
};

use crate::config::FetchConfig;
use crate::error::LoadError;
use crate::fetcher::{FetchAttempt, GatewayFetcher};
use crate::transport::{HttpClient, ReqwestHttpClient};

/// How fetched content is checked against a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    /// Accept whatever arrives.
    #[default]
    None,
    /// Hash the bytes as received.
    RawBytes(DigestCommitment),
    /// Parse as JSON, canonicalize, then hash.
    CanonicalJson(DigestCommitment),
}

impl Verification {
    /// Raw-byte verification against a hex commitment.
    pub fn raw(expected: &str) -> Result<Self, CommitmentError> {
        DigestCommitment::parse(expected).map(Self::RawBytes)
    }

    /// Canonical-JSON verification against a hex commitment.
    pub fn canonical(expected: &str) -> Result<Self, CommitmentError> {
        DigestCommitment::parse(expected).map(Self::CanonicalJson)
    }

    pub fn expected(&self) -> Option<&DigestCommitment> {
        match self {
            Self::None => None,
            Self::RawBytes(expected) | Self::CanonicalJson(expected) => Some(expected),
        }
    }
}

/// Content that passed its check.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub bytes: Bytes,
    /// The backend that served the bytes.
    pub backend: String,
    pub attempts: Vec<FetchAttempt>,
    /// The verified digest, when a check was requested.
    pub digest: Option<DigestCommitment>,
    /// The parsed document, when canonical-JSON verification ran.
    pub document: Option<Value>,
}

impl Loaded {
    /// The content as a JSON document.
    pub fn json(&self) -> Result<Value, LoadError> {
        match &self.document {
            Some(document) => Ok(document.clone()),
            None => parse_json(&self.bytes),
        }
    }

    /// The content as UTF-8 text.
    pub fn text(&self) -> Result<&str, LoadError> {
        std::str::from_utf8(&self.bytes).map_err(|e| LoadError::InvalidDocument(e.to_string()))
    }
}

/// Fetches content and checks it against an expected commitment.
#[derive(Debug, Clone)]
pub struct VerifiedLoader<C = ReqwestHttpClient> {
    fetcher: GatewayFetcher<C>,
}

impl VerifiedLoader<ReqwestHttpClient> {
    pub fn new(config: FetchConfig) -> Self {
        Self::from_fetcher(GatewayFetcher::new(config))
    }
}

impl<C: HttpClient> VerifiedLoader<C> {
    pub fn from_fetcher(fetcher: GatewayFetcher<C>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &GatewayFetcher<C> {
        &self.fetcher
    }

    /// Fetch `reference` and apply `verification`.
    pub async fn load(
        &self,
        reference: &ContentReference,
        verification: Verification,
        cancel: &CancellationToken,
    ) -> Result<Loaded, LoadError> {
        let fetched = self.fetcher.fetch(reference, cancel).await?;

        let (digest, document) = match verification {
            Verification::None => (None, None),
            Verification::RawBytes(expected) => {
                let actual = hash_bytes(&fetched.bytes);
                check(reference, expected, actual)?;
                (Some(actual), None)
            }
            Verification::CanonicalJson(expected) => {
                let document = trc8004_core::parse_json(&fetched.bytes)?;
                let actual = hash_bytes(&canonical_bytes(&document)?);
                check(reference, expected, actual)?;
                (Some(actual), Some(document))
            }
        };

        debug!(
            reference = %reference,
            backend = %fetched.backend,
            len = fetched.bytes.len(),
            verified = digest.is_some(),
            "content loaded"
        );

        Ok(Loaded {
            bytes: fetched.bytes,
            backend: fetched.backend,
            attempts: fetched.attempts,
            digest,
            document,
        })
    }

    /// Parse `uri`, fetch it and apply `verification`.
    pub async fn load_uri(
        &self,
        uri: &str,
        verification: Verification,
        cancel: &CancellationToken,
    ) -> Result<Loaded, LoadError> {
        let reference = ContentReference::parse(uri).map_err(crate::error::FetchError::from)?;
        self.load(&reference, verification, cancel).await
    }

    /// Fetch a JSON document, checking its canonical hash when `expected` is given.
    pub async fn load_json(
        &self,
        reference: &ContentReference,
        expected: Option<DigestCommitment>,
        cancel: &CancellationToken,
    ) -> Result<Value, LoadError> {
        let verification = expected.map_or(Verification::None, Verification::CanonicalJson);
        self.load(reference, verification, cancel).await?.json()
    }
}

fn check(
    reference: &ContentReference,
    expected: DigestCommitment,
    actual: DigestCommitment,
) -> Result<(), LoadError> {
    if expected == actual {
        return Ok(());
    }
    warn!(reference = %reference, %expected, %actual, "hash mismatch, discarding content");
    Err(LoadError::Verification { expected, actual })
}

fn parse_json(bytes: &[u8]) -> Result<Value, LoadError> {
    serde_json::from_slice(bytes).map_err(|e| LoadError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryHttpClient;
    use trc8004_core::{BackoffPolicy, FailureKind};

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const GATEWAY: &str = "https://gw/ipfs";

    fn loader(client: &MemoryHttpClient) -> VerifiedLoader<MemoryHttpClient> {
        let config = FetchConfig::default()
            .with_gateways([GATEWAY])
            .with_backoff(BackoffPolicy::immediate(2));
        VerifiedLoader::from_fetcher(GatewayFetcher::with_client(client.clone(), config))
    }

    fn reference() -> ContentReference {
        ContentReference::from_cid(CID).unwrap()
    }

    fn serve(client: &MemoryHttpClient, body: &'static str) {
        client.respond(format!("{GATEWAY}/{CID}"), 200, body);
    }

    #[tokio::test]
    async fn test_canonical_verification_ignores_formatting() {
        let client = MemoryHttpClient::new();
        serve(&client, "{\n  \"version\": \"1.0.0\",\n  \"name\": \"MyAgent\"\n}");

        let expected = Verification::canonical(
            "0x11953128AE3F273A3BA3AC1F429A858E92A27FDD61F56F8BDCD55801055CE657",
        )
        .unwrap();
        let loaded = loader(&client)
            .load(&reference(), expected, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(loaded.json().unwrap()["name"], "MyAgent");
        assert_eq!(loaded.digest.as_ref(), expected.expected());
    }

    #[tokio::test]
    async fn test_raw_verification() {
        let client = MemoryHttpClient::new();
        serve(&client, "hello");

        let expected = Verification::raw(
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8",
        )
        .unwrap();
        let loaded = loader(&client)
            .load(&reference(), expected, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(loaded.text().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_mismatch_is_rejected_without_retry() {
        let client = MemoryHttpClient::new();
        serve(&client, r#"{"name":"Impostor"}"#);

        let expected = DigestCommitment::from_bytes([0xab; 32]);
        let err = loader(&client)
            .load(
                &reference(),
                Verification::CanonicalJson(expected),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(FailureKind::VerificationFailed));
        match err {
            LoadError::Verification {
                expected: e,
                actual,
            } => {
                assert_eq!(e, expected);
                assert_ne!(actual, expected);
            }
            other => panic!("expected verification error, got {other:?}"),
        }
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_non_json_under_canonical_check() {
        let client = MemoryHttpClient::new();
        serve(&client, "not json");

        let err = loader(&client)
            .load_json(
                &reference(),
                Some(DigestCommitment::ZERO),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_oversized_integer_fails_canonical_check() {
        let client = MemoryHttpClient::new();
        serve(&client, r#"{"id":123456789012345678901234567891}"#);

        let approximate = serde_json::json!({"id": 1.2345678901234568e29});
        let expected = trc8004_core::compute_metadata_hash(&approximate).unwrap();
        let err = loader(&client)
            .load_json(&reference(), Some(expected), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_unverified_json() {
        let client = MemoryHttpClient::new();
        serve(&client, r#"{"skills":["a","b"]}"#);

        let document = loader(&client)
            .load_json(&reference(), None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(document["skills"][1], "b");
    }
}
