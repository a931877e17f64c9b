//! Fetch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trc8004_core::BackoffPolicy;

/// Public content-network gateways, in preference order.
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://ipfs.io/ipfs",
    "https://gateway.pinata.cloud/ipfs",
    "https://cloudflare-ipfs.com/ipfs",
];

/// Configuration for fetching and uploading content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Gateway base URLs, tried in order.
    pub gateways: Vec<String>,
    /// Bound on a single attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
    /// Retry policy applied to each candidate independently.
    pub backoff: BackoffPolicy,
    /// Endpoint accepting JSON uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_endpoint: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            attempt_timeout_ms: 30_000,
            backoff: BackoffPolicy::default(),
            upload_endpoint: None,
        }
    }
}

impl FetchConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Replace the gateway list.
    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// Put `gateway` first, keeping the others in order without duplicates.
    pub fn with_preferred_gateway(mut self, gateway: impl Into<String>) -> Self {
        let gateway = gateway.into();
        let key = gateway.trim_end_matches('/').to_string();
        self.gateways
            .retain(|g| g.trim_end_matches('/') != key.as_str());
        self.gateways.insert(0, gateway);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_upload_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.upload_endpoint = Some(endpoint.into());
        self
    }
}
