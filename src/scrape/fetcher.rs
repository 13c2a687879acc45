// src/scrape/fetcher.rs
//! Page fetcher: one GET per attempt, bounded retries with linear backoff.
//!
//! The single-attempt transport sits behind [`HttpTransport`] so the retry loop
//! can be driven by a scripted transport in tests. Production uses
//! [`ReqwestTransport`], which carries the per-attempt timeout and the
//! `User-Agent` on the client itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;

use crate::config::ServiceConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Performs exactly one GET and returns the body text of a 2xx response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed transport. Timeout and `User-Agent` are client-level settings.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let resp = self.client.get(url).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(classify)
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base × retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(retry)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Builds the production fetcher (reqwest transport) from config.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&cfg.user_agent, cfg.timeout())?;
        Ok(Self::new(Arc::new(transport), cfg.retry_policy()))
    }

    /// GET `url`, retrying on any failure. The last failure is returned once
    /// `max_retries + 1` attempts have failed.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.transport.get_text(url).await {
                Ok(body) => {
                    tracing::debug!(target: "scrape", %url, attempt, bytes = body.len(), "fetched page");
                    return Ok(body);
                }
                Err(e) if attempt <= self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        target: "scrape",
                        error = %e,
                        %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "fetch attempt failed; retrying"
                    );
                    counter!("scrape_fetch_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
