//! HTTP transport abstraction.
//!
//! The fetcher and uploader talk to the network only through [`HttpClient`].
//! Implementations own connection pooling and TLS and must be safe to share
//! between concurrent fetches. Per-attempt timeouts are enforced by the
//! caller, not the client.

use async_trait::async_trait;
use bytes::Bytes;
use trc8004_core::FailureKind;

use crate::error::AttemptFailure;

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The response body bytes.
    pub body: Bytes,

    /// The length the server announced, if any.
    pub content_length: Option<u64>,
}

impl HttpResponse {
    /// A complete response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            content_length: Some(body.len() as u64),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether fewer bytes arrived than the server announced.
    pub fn is_truncated(&self) -> bool {
        matches!(self.content_length, Some(len) if (self.body.len() as u64) < len)
    }
}

/// An async HTTP client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET request.
    async fn get(&self, url: &str) -> Result<HttpResponse, AttemptFailure>;

    /// Send a POST request with the given headers and body.
    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<HttpResponse, AttemptFailure>;
}

/// A [`reqwest`]-backed implementation of [`HttpClient`].
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, AttemptFailure> {
        let resp = request.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let content_length = resp.content_length();

        // The connection may drop after the headers arrived.
        let body = resp
            .bytes()
            .await
            .map_err(|e| AttemptFailure::new(FailureKind::Truncated, e.to_string()))?;

        Ok(HttpResponse {
            status,
            body,
            content_length,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, AttemptFailure> {
        self.send(self.inner.get(url)).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<HttpResponse, AttemptFailure> {
        let mut builder = self.inner.post(url);
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        self.send(builder.body(body)).await
    }
}

fn classify(err: reqwest::Error) -> AttemptFailure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::ConnectionRefused
    } else if err.is_builder() {
        FailureKind::MalformedReference
    } else if err.is_body() || err.is_decode() {
        FailureKind::Truncated
    } else if let Some(status) = err.status() {
        FailureKind::from_status(status.as_u16()).unwrap_or(FailureKind::Unreachable)
    } else {
        FailureKind::Unreachable
    };
    AttemptFailure::new(kind, err.to_string())
}

/// A scripted in-memory client for testing.
///
/// Responses are queued per URL and consumed in order; the last queued
/// response for a URL repeats forever. Unknown URLs answer 404. Every request
/// is recorded.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    /// One scripted reply.
    #[derive(Debug, Clone)]
    pub enum Scripted {
        /// Answer with a complete response.
        Respond(HttpResponse),
        /// Fail before any response arrives.
        Fail(FailureKind),
        /// Never answer.
        Stall,
    }

    /// A request seen by the client.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub body: Bytes,
    }

    #[derive(Debug, Default)]
    struct State {
        routes: HashMap<String, VecDeque<Scripted>>,
        requests: Vec<RecordedRequest>,
    }

    /// In-memory [`HttpClient`]. Clones share one script and request log.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryHttpClient {
        state: Arc<Mutex<State>>,
    }

    impl MemoryHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Queue a scripted reply for `url`.
        pub fn script(&self, url: impl Into<String>, reply: Scripted) -> &Self {
            self.lock()
                .routes
                .entry(url.into())
                .or_default()
                .push_back(reply);
            self
        }

        /// Queue a complete response for `url`.
        pub fn respond(
            &self,
            url: impl Into<String>,
            status: u16,
            body: impl Into<Bytes>,
        ) -> &Self {
            self.script(url, Scripted::Respond(HttpResponse::new(status, body)))
        }

        /// Queue a transport failure for `url`.
        pub fn fail(&self, url: impl Into<String>, kind: FailureKind) -> &Self {
            self.script(url, Scripted::Fail(kind))
        }

        /// Queue a response whose body is shorter than announced.
        pub fn truncate(&self, url: impl Into<String>, body: impl Into<Bytes>, announced: u64) -> &Self {
            let body = body.into();
            self.script(
                url,
                Scripted::Respond(HttpResponse {
                    status: 200,
                    body,
                    content_length: Some(announced),
                }),
            )
        }

        /// Every request made so far, in order.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.lock().requests.clone()
        }

        pub fn request_count(&self) -> usize {
            self.lock().requests.len()
        }

        /// Requests made to `url`.
        pub fn requests_to(&self, url: &str) -> usize {
            self.lock().requests.iter().filter(|r| r.url == url).count()
        }

        fn next_reply(&self, method: &'static str, url: &str, body: Bytes) -> Scripted {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body,
            });

            match state.routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Scripted::Stall),
                Some(queue) => queue.front().cloned().unwrap_or(Scripted::Stall),
                None => Scripted::Respond(HttpResponse::new(404, Bytes::from_static(b"not found"))),
            }
        }

        async fn play(reply: Scripted, url: &str) -> Result<HttpResponse, AttemptFailure> {
            match reply {
                Scripted::Respond(response) => Ok(response),
                Scripted::Fail(kind) => Err(AttemptFailure::new(kind, format!("scripted failure for {url}"))),
                Scripted::Stall => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl HttpClient for MemoryHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, AttemptFailure> {
            let reply = self.next_reply("GET", url, Bytes::new());
            Self::play(reply, url).await
        }

        async fn post(
            &self,
            url: &str,
            _headers: &[(&str, &str)],
            body: Bytes,
        ) -> Result<HttpResponse, AttemptFailure> {
            let reply = self.next_reply("POST", url, body);
            Self::play(reply, url).await
        }
    }
}
