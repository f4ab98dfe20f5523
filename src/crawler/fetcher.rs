//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with browser-like headers
//! - GET requests for index and article pages
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::HttpConfig;
use crate::{ConfigError, ErrorKind, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, PRAGMA, REFERER, USER_AGENT};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Status codes that are retried before giving up
pub const RETRY_STATUSES: [u16; 5] = [500, 501, 502, 503, 504];

/// Errors produced while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, connection failure, or a status in [`RETRY_STATUSES`]
    #[error("Transient failure for {url}: {reason}")]
    Transient { url: String, reason: String },

    /// Non-retryable HTTP status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Every attempt failed transiently
    #[error("Unreachable after {attempts} attempts: {url} (last: {last})")]
    Unreachable {
        url: String,
        attempts: u32,
        last: String,
    },

    /// The request could not be built at all
    #[error("Invalid request for {url}: {reason}")]
    Request { url: String, reason: String },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Status { .. } | Self::Unreachable { .. } | Self::Request { .. } => {
                ErrorKind::Unreachable
            }
        }
    }
}

/// Anything that can hand back the raw bytes behind a URL
///
/// Discovery and scheduling only depend on this trait, so tests can substitute
/// instrumented sources for the network.
pub trait PageSource: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// How often and how patiently a request is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Wait before the first retry
    pub backoff_base: Duration,

    /// Multiplier applied to the wait after each retry
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
            backoff_factor: config.retry_backoff_factor,
        }
    }

    /// Wait before retry number `retry` (1-based)
    ///
    /// `backoff_base * backoff_factor^(retry - 1)`
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as i32;
        let nanos = self.backoff_base.as_nanos() as f64 * self.backoff_factor.powi(exponent);
        Duration::from_nanos(nanos.round().min(u64::MAX as f64) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(200),
            backoff_factor: 2.0,
        }
    }
}

/// Builds an HTTP client with the configured headers
///
/// The referer falls back to `default_referer` (normally the index URL). Content
/// encoding is negotiated by reqwest itself, so no Accept-Encoding header is set here.
///
/// # Example
///
/// ```no_run
/// use allpages_harvester::config::HttpConfig;
/// use allpages_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default(), "https://or.wikipedia.org").unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig, default_referer: &str) -> Result<Client, HarvestError> {
    let referer = config.referer.as_deref().unwrap_or(default_referer);

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value("user-agent", &config.user_agent)?);
    headers.insert(REFERER, header_value("referer", referer)?);
    headers.insert(ACCEPT, header_value("accept", &config.accept)?);
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;

    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HarvestError> {
    HeaderValue::from_str(value).map_err(|e| {
        HarvestError::Config(ConfigError::Validation(format!(
            "invalid {} header value: {}",
            name, e
        )))
    })
}

/// Returns true for statuses worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

/// Resilient GET over a shared connection pool
///
/// Cloning is cheap; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher from the `[http]` configuration section
    pub fn from_config(config: &HttpConfig, index_url: &Url) -> Result<Self, HarvestError> {
        let client = build_http_client(config, index_url.as_str())?;
        Ok(Self::new(client, RetryPolicy::from_config(config)))
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | 500, 501, 502, 503, 504 | Retry with backoff |
    /// | Timeout / connection failure | Retry with backoff |
    /// | Any other status | Fail immediately with `Status` |
    /// | Attempts exhausted | Fail with `Unreachable` |
    pub async fn fetch_with_retry(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.fetch_once(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::debug!(url = %url, attempt, "fetch succeeded after retry");
                    }
                    return Ok(body);
                }
                Err(FetchError::Transient { reason, .. }) => {
                    if attempt >= max_attempts {
                        tracing::warn!(
                            url = %url,
                            attempts = attempt,
                            error = %reason,
                            "fetch exhausted retries"
                        );
                        return Err(FetchError::Unreachable {
                            url: url.to_string(),
                            attempts: attempt,
                            last: reason,
                        });
                    }

                    let delay = self.policy.backoff(attempt);
                    tracing::debug!(
                        url = %url,
                        attempt,
                        max = max_attempts,
                        ?delay,
                        error = %reason,
                        "fetch attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Performs a single GET and classifies the outcome
    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();

        if is_retryable_status(status) {
            return Err(FetchError::Transient {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match response.bytes().await {
            Ok(body) => Ok(body.to_vec()),
            Err(e) => Err(FetchError::Transient {
                url: url.to_string(),
                reason: format!("body read failed: {}", e),
            }),
        }
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        self.fetch_with_retry(url)
    }
}

/// Maps a reqwest send error onto the fetch taxonomy
fn classify_request_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        return FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };
    }

    let reason = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };

    FetchError::Transient {
        url: url.to_string(),
        reason,
    }
}
