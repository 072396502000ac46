//! HTTP fetch client
//!
//! Issues GET requests with a fixed timeout and consistent headers. Every
//! request passes through the rate limiter first. Transient failures
//! (timeout, connection error, 5xx, 429) are retried with exponential
//! backoff; anything else fails immediately. The shared consecutive-error
//! counter is incremented when a fetch finally fails and reset on success,
//! letting the coordinator abort runs that keep failing back to back.

use crate::config::HttpConfig;
use crate::scrape::limiter::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,

    /// Final URL after any redirects
    pub url: Url,
}

/// Why a fetch attempt failed
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    #[error("request timeout")]
    Timeout,

    #[error("connection error")]
    Connect,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("{0}")]
    Request(String),
}

/// A fetch that failed after exhausting its retries
#[derive(Debug, Error)]
#[error("Fetch failed for {url} after {attempts} attempt(s): {kind}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub kind: FetchErrorKind,
}

/// Counter of back-to-back failures, shared between the fetch client and
/// the coordinator
#[derive(Debug, Clone, Default)]
pub struct ErrorCounter(Arc<AtomicU32>);

impl ErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and returns the new consecutive count.
    pub fn record_failure(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clears the streak after a success.
    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builds the underlying HTTP client with consistent headers and timeout
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP fetch client for one scraping run
pub struct FetchClient {
    client: Client,
    limiter: Arc<RateLimiter>,
    errors: ErrorCounter,
    max_attempts: u32,
    backoff_factor: f64,
    initial_backoff: Duration,
}

impl FetchClient {
    pub fn new(
        config: &HttpConfig,
        limiter: Arc<RateLimiter>,
        errors: ErrorCounter,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            limiter,
            errors,
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        })
    }

    /// Fetches a URL, retrying transient failures with exponential backoff.
    ///
    /// Each attempt acquires a rate-limiter permit first. Retries stop at
    /// `max_attempts` or on the first non-transient failure; the consecutive
    /// error counter is updated on the final outcome either way.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            attempt += 1;
            self.limiter.acquire().await;

            match self.try_fetch(url).await {
                Ok(page) => {
                    self.errors.reset();
                    tracing::debug!("Fetched {} ({})", url, page.status);
                    return Ok(page);
                }
                Err((kind, transient)) => {
                    if !transient || attempt >= self.max_attempts {
                        let streak = self.errors.record_failure();
                        tracing::warn!(
                            "Fetch failed for {} after {} attempt(s): {} ({} consecutive errors)",
                            url,
                            attempt,
                            kind,
                            streak
                        );
                        return Err(FetchError {
                            url: url.to_string(),
                            attempts: attempt,
                            kind,
                        });
                    }

                    tracing::debug!(
                        "Transient error for {} (attempt {}/{}): {}; backing off {:?}",
                        url,
                        attempt,
                        self.max_attempts,
                        kind,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.mul_f64(self.backoff_factor);
                }
            }
        }
    }

    /// One GET attempt. The boolean marks whether the failure is transient.
    async fn try_fetch(&self, url: &Url) -> Result<FetchedPage, (FetchErrorKind, bool)> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            let transient = status.is_server_error() || status.as_u16() == 429;
            return Err((FetchErrorKind::Status(status.as_u16()), transient));
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify_error)?;

        Ok(FetchedPage {
            status: status.as_u16(),
            body,
            url: final_url,
        })
    }
}

fn classify_error(error: reqwest::Error) -> (FetchErrorKind, bool) {
    if error.is_timeout() {
        (FetchErrorKind::Timeout, true)
    } else if error.is_connect() {
        (FetchErrorKind::Connect, true)
    } else {
        (FetchErrorKind::Request(error.to_string()), true)
    }
}
