//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - The [`HttpTransport`] seam (one GET with a timeout) and its reqwest implementation
//! - Building HTTP clients with a polite user agent string
//! - Bounded retry with exponential backoff
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Status and body of one HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

/// Failure to get any response at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl TransportError {
    /// Classifies a reqwest error
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            Self::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// A single failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Every attempt allowed by the [`RetryPolicy`] failed
///
/// This is reported for the one URL only; it never stops the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to retrieve {url} after {attempts} attempts: {last_error}")]
pub struct TerminalFailure {
    /// The URL that could not be fetched
    pub url: String,

    /// Number of attempts made
    pub attempts: u32,

    /// Error from the final attempt
    pub last_error: FetchError,
}

/// One GET with a timeout
///
/// Implemented by [`ReqwestTransport`] in production and by scripted fakes in
/// tests, so retry and extraction logic never need a real network.
pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawPage, TransportError>> + Send;
}

/// [`HttpTransport`] backed by a shared reqwest [`Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with a client identified by `config`
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawPage, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        Ok(RawPage { status, body })
    }
}

/// Builds an HTTP client with proper configuration
///
/// Per-request timeouts are applied by the caller; the client only bounds the
/// connect phase.
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Client sending the polite user agent
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use ency_harvest::config::UserAgentConfig;
/// use ency_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubled after each further failure
    pub backoff_base: Duration,

    /// Timeout for each individual attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            timeout,
        }
    }

    /// Policy for paths that never retry (index discovery)
    pub fn single_attempt(timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, timeout)
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_retries,
            config.backoff_base(),
            config.request_timeout(),
        )
    }

    /// Wait after failed attempt number `attempt` (1-indexed): `base * 2^(attempt-1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Performs one GET and treats anything but HTTP 200 as a failure
///
/// # Arguments
///
/// * `transport` - Transport issuing the request
/// * `url` - The URL to fetch
/// * `timeout` - Bound on the whole request
///
/// # Returns
///
/// * `Ok(String)` - Body of a 200 response
/// * `Err(FetchError)` - Transport error or any other status
pub async fn fetch_once<T: HttpTransport>(
    transport: &T,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let page = transport.get(url, timeout).await?;

    if page.status != StatusCode::OK.as_u16() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: page.status,
        });
    }

    Ok(page.body)
}

/// Fetches a URL, retrying failed attempts according to `policy`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Return body immediately |
/// | Other HTTP status | Retry after backoff |
/// | Timeout / connection / request error | Retry after backoff |
/// | Attempts exhausted | [`TerminalFailure`] |
///
/// No wait follows the final attempt. Sleeping only suspends the calling task.
///
/// # Arguments
///
/// * `transport` - Transport issuing each attempt
/// * `url` - The URL to fetch
/// * `policy` - Attempt count, backoff base and per-attempt timeout
///
/// # Returns
///
/// * `Ok(String)` - Body of the first successful attempt
/// * `Err(TerminalFailure)` - Every attempt failed; carries the last error
pub async fn fetch_with_retry<T: HttpTransport>(
    transport: &T,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, TerminalFailure> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match fetch_once(transport, url, policy.timeout).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts {
            tracing::warn!("Giving up on {} after {} attempts: {}", url, attempt, error);
            return Err(TerminalFailure {
                url: url.to_string(),
                attempts: attempt,
                last_error: error,
            });
        }

        let wait = policy.delay_after(attempt);
        tracing::warn!(
            "Attempt {}/{}: failed to fetch {}. Retrying in {:?}... [Error: {}]",
            attempt,
            policy.max_attempts,
            url,
            wait,
            error
        );
        tokio::time::sleep(wait).await;
    }
}
