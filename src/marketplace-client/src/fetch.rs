//! Document transport.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, FetchError};

/// Fetches the raw bytes of a document.
///
/// Implementations own timeout and redirect policy. There is no retry.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url`, failing with [`FetchError::Unreachable`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher, optionally reading `file:` URLs from disk.
pub struct HttpFetcher {
    client: Client,
    allow_file_urls: bool,
}

impl HttpFetcher {
    /// Build a fetcher using the timeouts and user agent from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ClientError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            allow_file_urls: config.allow_file_urls,
        })
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::unreachable(url, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::unreachable(url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::unreachable(url, format!("failed to read body: {}", e)))?;

        Ok(body.to_vec())
    }

    async fn fetch_file(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = Url::parse(url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| FetchError::unreachable(url, "not a valid file URL"))?;

        tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::unreachable(url, e.to_string()))
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let result = if url.starts_with("file:") {
            if !self.allow_file_urls {
                return Err(FetchError::unreachable(url, "file URLs are disabled"));
            }
            self.fetch_file(url).await
        } else {
            self.fetch_http(url).await
        };

        match &result {
            Ok(body) => debug!(bytes = body.len(), "Fetched document"),
            Err(e) => warn!(error = %e, "Fetch failed"),
        }
        result
    }
}

/// Fetcher serving documents from memory.
///
/// Useful for tests and for repositories that have already been mirrored.
/// Every fetched URL is recorded.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    /// Empty fetcher; every URL is unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.documents.insert(url.into(), body.into());
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DocumentFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::unreachable(url, "HTTP 404 Not Found"))
    }
}

/// Caps the number of requests in flight through the wrapped fetcher.
///
/// A permit is held only while a single request runs, so a recursive
/// caller can never block on itself.
pub struct LimitedFetcher<F> {
    inner: F,
    permits: Semaphore,
    max_in_flight: usize,
}

impl<F> LimitedFetcher<F> {
    /// Allow at most `max_in_flight` concurrent requests (minimum 1).
    pub fn new(inner: F, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            inner,
            permits: Semaphore::new(max_in_flight),
            max_in_flight,
        }
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Configured request limit.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

#[async_trait]
impl<F: DocumentFetcher> DocumentFetcher for LimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::unreachable(url, "fetcher is shut down"))?;
        self.inner.fetch(url).await
    }
}
