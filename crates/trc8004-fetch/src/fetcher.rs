//! Multi-backend content fetching with per-candidate retry.
//!
//! A reference is turned into an ordered candidate list: every configured
//! gateway for content-network references, or the single web or file
//! backend otherwise. Candidates are tried strictly in order. Each one gets
//! its own [`BackoffState`]; transient failures are retried against the same
//! candidate until its budget is spent, then the next candidate is tried.
//! The first success ends the fetch.
//!
//! Both suspension points, the attempt and the wait between attempts, race
//! against the caller's [`CancellationToken`]. Cancellation abandons the
//! in-flight attempt and ends the fetch without trying anything else.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trc8004_core::{BackendKind, BackoffPolicy, ContentReference, Decision, FailureKind};

use crate::config::FetchConfig;
use crate::error::{AttemptFailure, CandidateFailure, FetchError, Result};
use crate::transport::{HttpClient, ReqwestHttpClient};

/// One backend able to serve a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A content-network gateway.
    Gateway { base: String, url: String },
    /// A direct web request.
    Web { url: String },
    /// A local file.
    File { path: PathBuf },
}

impl Candidate {
    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Gateway { .. } => BackendKind::Gateway,
            Self::Web { .. } => BackendKind::Web,
            Self::File { .. } => BackendKind::File,
        }
    }

    /// Identifier used in logs and errors.
    pub fn id(&self) -> String {
        match self {
            Self::Gateway { base, .. } => base.clone(),
            Self::Web { url } => url.clone(),
            Self::File { path } => format!("file://{}", path.display()),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { len: usize },
    Failure(AttemptFailure),
}

/// One try against one backend.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub backend: String,
    /// Zero-based attempt number on this backend.
    pub attempt: u32,
    pub started_at: SystemTime,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl FetchAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}

/// Successfully fetched content.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Bytes,
    /// The backend that served the bytes.
    pub backend: String,
    /// Every attempt made, in order, the last one being the success.
    pub attempts: Vec<FetchAttempt>,
}

enum Halt {
    Cancelled,
    GaveUp(CandidateFailure),
}

/// Resolves references to bytes over a configurable set of backends.
#[derive(Debug, Clone)]
pub struct GatewayFetcher<C = ReqwestHttpClient> {
    client: C,
    config: FetchConfig,
}

impl GatewayFetcher<ReqwestHttpClient> {
    /// Create a fetcher using a fresh `reqwest` client.
    pub fn new(config: FetchConfig) -> Self {
        Self::with_client(ReqwestHttpClient::new(), config)
    }
}

impl<C: HttpClient> GatewayFetcher<C> {
    pub fn with_client(client: C, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The candidates for `reference`, in the order they will be tried.
    pub fn candidates(&self, reference: &ContentReference) -> Vec<Candidate> {
        match reference {
            ContentReference::Content { .. } => self
                .config
                .gateways
                .iter()
                .filter_map(|base| {
                    reference.gateway_url(base).map(|url| Candidate::Gateway {
                        base: base.clone(),
                        url,
                    })
                })
                .collect(),
            ContentReference::Web { url } => vec![Candidate::Web { url: url.clone() }],
            ContentReference::File { path } => vec![Candidate::File { path: path.clone() }],
        }
    }

    /// Parse `uri` and fetch it.
    pub async fn fetch_uri(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched> {
        let reference = ContentReference::parse(uri)?;
        self.fetch(&reference, cancel).await
    }

    /// Fetch the bytes behind `reference`.
    pub async fn fetch(
        &self,
        reference: &ContentReference,
        cancel: &CancellationToken,
    ) -> Result<Fetched> {
        let candidates = self.candidates(reference);
        if candidates.is_empty() {
            return Err(FetchError::NoCandidates(reference.scheme().as_str().into()));
        }

        let mut attempts = Vec::new();
        let mut failures = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            match self.run_candidate(candidate, cancel, &mut attempts).await {
                Ok(bytes) => {
                    return Ok(Fetched {
                        bytes,
                        backend: candidate.id(),
                        attempts,
                    })
                }
                Err(Halt::Cancelled) => {
                    debug!(reference = %reference, "fetch cancelled");
                    return Err(FetchError::Cancelled);
                }
                Err(Halt::GaveUp(failure)) => failures.push(failure),
            }
        }

        warn!(
            reference = %reference,
            candidates = failures.len(),
            "all candidates failed"
        );

        if failures.len() == 1 {
            let failure = failures.remove(0);
            Err(FetchError::Failed(failure))
        } else {
            Err(FetchError::Aggregate(failures))
        }
    }

    fn policy_for(&self, candidate: &Candidate) -> BackoffPolicy {
        match candidate {
            // Filesystem errors are final.
            Candidate::File { .. } => BackoffPolicy::no_retry(),
            _ => self.config.backoff,
        }
    }

    async fn run_candidate(
        &self,
        candidate: &Candidate,
        cancel: &CancellationToken,
        log: &mut Vec<FetchAttempt>,
    ) -> std::result::Result<Bytes, Halt> {
        let mut state = self.policy_for(candidate).start();
        let backend = candidate.id();

        loop {
            if cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }

            let attempt = state.attempt();
            let started_at = SystemTime::now();
            let clock = Instant::now();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Halt::Cancelled),
                result = self.attempt_bounded(candidate) => result,
            };

            let elapsed = clock.elapsed();

            let failure = match result {
                Ok(bytes) => {
                    debug!(backend = %backend, attempt, len = bytes.len(), "fetch succeeded");
                    log.push(FetchAttempt {
                        backend,
                        attempt,
                        started_at,
                        elapsed,
                        outcome: AttemptOutcome::Success { len: bytes.len() },
                    });
                    return Ok(bytes);
                }
                Err(failure) => failure,
            };

            log.push(FetchAttempt {
                backend: backend.clone(),
                attempt,
                started_at,
                elapsed,
                outcome: AttemptOutcome::Failure(failure.clone()),
            });

            match state.decide(failure.kind) {
                Decision::Retry { wait, next } => {
                    debug!(
                        backend = %backend,
                        attempt,
                        wait_ms = millis(wait),
                        error = %failure,
                        "retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Halt::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                    state = next;
                }
                Decision::GiveUp(reason) => {
                    warn!(backend = %backend, attempts = attempt + 1, error = %failure, "giving up on backend");
                    return Err(Halt::GaveUp(CandidateFailure {
                        backend,
                        failure: AttemptFailure::new(reason.failure(), failure.message),
                        attempts: attempt + 1,
                    }));
                }
            }
        }
    }

    async fn attempt_bounded(
        &self,
        candidate: &Candidate,
    ) -> std::result::Result<Bytes, AttemptFailure> {
        let timeout = self.config.attempt_timeout();
        match tokio::time::timeout(timeout, self.attempt(candidate)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::new(
                FailureKind::Timeout,
                format!("no response within {}ms", timeout.as_millis()),
            )),
        }
    }

    async fn attempt(&self, candidate: &Candidate) -> std::result::Result<Bytes, AttemptFailure> {
        match candidate {
            Candidate::Gateway { url, .. } | Candidate::Web { url } => self.attempt_http(url).await,
            Candidate::File { path } => read_file(path).await,
        }
    }

    async fn attempt_http(&self, url: &str) -> std::result::Result<Bytes, AttemptFailure> {
        let response = self.client.get(url).await?;

        if !response.is_success() {
            let kind = FailureKind::from_status(response.status)
                .unwrap_or(FailureKind::ClientError(response.status));
            return Err(AttemptFailure::new(kind, format!("{url} answered {}", response.status)));
        }

        if response.is_truncated() {
            return Err(AttemptFailure::new(
                FailureKind::Truncated,
                format!(
                    "{url} sent {} of {} bytes",
                    response.body.len(),
                    response.content_length.unwrap_or_default()
                ),
            ));
        }

        Ok(response.body)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn read_file(path: &std::path::Path) -> std::result::Result<Bytes, AttemptFailure> {
    tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => FailureKind::NotFound,
            std::io::ErrorKind::PermissionDenied => FailureKind::Unauthorized(403),
            _ => FailureKind::Io,
        };
        AttemptFailure::new(kind, format!("{}: {e}", path.display()))
    })
}
