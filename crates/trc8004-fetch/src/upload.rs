//! Publishing documents to the content network.
//!
//! Documents are uploaded as canonical JSON so the digest the caller commits
//! on-chain is the digest a later verified load will recompute.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trc8004_core::{
    canonicalize, hash_bytes, BackoffPolicy, ContentReference, Decision, DigestCommitment,
    FailureKind,
};

use crate::config::FetchConfig;
use crate::error::{AttemptFailure, CandidateFailure, UploadError};
use crate::transport::{HttpClient, ReqwestHttpClient};

/// Response fields that may carry the content identifier.
const CID_FIELDS: &[&str] = &["hash", "cid", "Hash", "IpfsHash"];

/// A published document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// `ipfs://<cid>` reference to the document.
    pub reference: ContentReference,
    /// Commitment over the canonical bytes that were uploaded.
    pub digest: DigestCommitment,
}

/// Uploads JSON documents to a pinning endpoint.
#[derive(Debug, Clone)]
pub struct ContentUploader<C = ReqwestHttpClient> {
    client: C,
    endpoint: String,
    backoff: BackoffPolicy,
    attempt_timeout: Duration,
}

impl<C: HttpClient> ContentUploader<C> {
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            backoff: BackoffPolicy::default(),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Build from a fetch configuration's upload endpoint and retry policy.
    pub fn from_config(client: C, config: &FetchConfig) -> Result<Self, UploadError> {
        let endpoint = config
            .upload_endpoint
            .clone()
            .ok_or(UploadError::NotConfigured)?;
        Ok(Self {
            client,
            endpoint,
            backoff: config.backoff,
            attempt_timeout: config.attempt_timeout(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `document` and return its reference and commitment.
    pub async fn upload<T: Serialize + ?Sized>(
        &self,
        document: &T,
        cancel: &CancellationToken,
    ) -> Result<Uploaded, UploadError> {
        let body = Bytes::from(canonicalize(document)?);
        let digest = hash_bytes(&body);

        let mut state = self.backoff.start();
        loop {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let attempt = state.attempt();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                result = self.attempt(body.clone()) => result,
            };

            let failure = match result {
                Ok(cid) => {
                    let reference = ContentReference::from_cid(&cid).map_err(|_| {
                        UploadError::InvalidResponse(format!("invalid content identifier {cid:?}"))
                    })?;
                    debug!(endpoint = %self.endpoint, %reference, %digest, "document uploaded");
                    return Ok(Uploaded { reference, digest });
                }
                Err(AttemptError::Response(message)) => {
                    return Err(UploadError::InvalidResponse(message))
                }
                Err(AttemptError::Transport(failure)) => failure,
            };

            match state.decide(failure.kind) {
                Decision::Retry { wait, next } => {
                    debug!(endpoint = %self.endpoint, attempt, error = %failure, "retrying upload");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                    state = next;
                }
                Decision::GiveUp(_) => {
                    warn!(endpoint = %self.endpoint, error = %failure, "upload failed");
                    return Err(UploadError::Failed(CandidateFailure {
                        backend: self.endpoint.clone(),
                        failure,
                        attempts: attempt + 1,
                    }));
                }
            }
        }
    }

    async fn attempt(&self, body: Bytes) -> Result<String, AttemptError> {
        let headers = [("content-type", "application/json")];
        let response = match tokio::time::timeout(
            self.attempt_timeout,
            self.client.post(&self.endpoint, &headers, body),
        )
        .await
        {
            Ok(result) => result.map_err(AttemptError::Transport)?,
            Err(_) => {
                return Err(AttemptError::Transport(AttemptFailure::new(
                    FailureKind::Timeout,
                    "upload timed out",
                )))
            }
        };

        if !response.is_success() {
            let kind = FailureKind::from_status(response.status)
                .unwrap_or(FailureKind::ClientError(response.status));
            return Err(AttemptError::Transport(AttemptFailure::new(
                kind,
                format!("upload endpoint answered {}", response.status),
            )));
        }

        let value: Value = serde_json::from_slice(&response.body)
            .map_err(|e| AttemptError::Response(e.to_string()))?;
        extract_cid(&value)
            .map(str::to_string)
            .ok_or_else(|| AttemptError::Response("no content identifier in response".into()))
    }
}

enum AttemptError {
    Transport(AttemptFailure),
    Response(String),
}

fn extract_cid(value: &Value) -> Option<&str> {
    CID_FIELDS
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .find(|cid| !cid.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryHttpClient;
    use serde_json::json;

    const ENDPOINT: &str = "https://pin.example/upload";

    fn uploader(client: &MemoryHttpClient) -> ContentUploader<MemoryHttpClient> {
        ContentUploader::new(client.clone(), ENDPOINT).with_backoff(BackoffPolicy::immediate(3))
    }

    #[tokio::test]
    async fn test_upload_posts_canonical_json() {
        let client = MemoryHttpClient::new();
        client.respond(ENDPOINT, 200, r#"{"hash":"QmUploaded"}"#);

        let uploaded = uploader(&client)
            .upload(&json!({"version": "1.0.0", "name": "MyAgent"}), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(uploaded.reference.to_string(), "ipfs://QmUploaded");
        assert_eq!(
            uploaded.digest.to_hex(),
            "0x11953128ae3f273a3ba3ac1f429a858e92a27fdd61f56f8bdcd55801055ce657"
        );
        let requests = client.requests();
        assert_eq!(
            requests[0].body,
            Bytes::from_static(br#"{"name":"MyAgent","version":"1.0.0"}"#)
        );
    }

    #[tokio::test]
    async fn test_upload_retries_server_errors() {
        let client = MemoryHttpClient::new();
        client
            .respond(ENDPOINT, 502, "bad gateway")
            .respond(ENDPOINT, 200, r#"{"cid":"QmRetried"}"#);

        let uploaded = uploader(&client)
            .upload(&json!({}), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(uploaded.reference.cid(), Some("QmRetried"));
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_without_identifier() {
        let client = MemoryHttpClient::new();
        client.respond(ENDPOINT, 200, r#"{"ok":true}"#);

        let err = uploader(&client)
            .upload(&json!({}), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejected() {
        let client = MemoryHttpClient::new();
        client.respond(ENDPOINT, 401, "unauthorized");

        let err = uploader(&client)
            .upload(&json!({}), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            UploadError::Failed(failure) => {
                assert_eq!(failure.failure.kind, FailureKind::Unauthorized(401));
                assert_eq!(failure.attempts, 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_requires_endpoint() {
        let result = ContentUploader::from_config(MemoryHttpClient::new(), &FetchConfig::default());
        assert!(matches!(result, Err(UploadError::NotConfigured)));
    }
}
