// tests/common/mod.rs
//
// Shared helpers: a scripted transport standing in for the network, and
// state/router builders wired around it.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pet_news_events::scrape::fetcher::{FetchError, Fetcher, HttpTransport, RetryPolicy};
use pet_news_events::{AppState, EventCache, Scraper};
use url::Url;

pub const FIXTURE_HTML: &str = include_str!("../fixtures/wanco_news.html");
pub const SOURCE_URL: &str = "https://wanco.ac.jp/news/";

/// Pops queued outcomes; once the queue is empty it keeps returning `fallback`.
pub struct MockTransport {
    queue: Mutex<VecDeque<Result<String, FetchError>>>,
    fallback: Result<String, FetchError>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn always(outcome: Result<String, FetchError>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn serving(html: &str) -> Self {
        Self::always(Ok(html.to_string()))
    }

    pub fn failing(status: u16) -> Self {
        Self::always(Err(status_err(status)))
    }

    /// Queue outcomes that are served before the fallback.
    pub fn then(self, outcome: Result<String, FetchError>) -> Self {
        self.queue.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get_text(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queue.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn status_err(status: u16) -> FetchError {
    FetchError::Status {
        url: SOURCE_URL.to_string(),
        status,
    }
}

/// Tiny backoff so failing scenarios finish quickly on a real clock.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        backoff_base: Duration::from_millis(1),
    }
}

pub fn scraper_with(transport: Arc<MockTransport>, ttl: Duration) -> Scraper {
    let cache = Arc::new(EventCache::new(ttl));
    Scraper::new(
        Fetcher::new(transport, fast_policy()),
        cache,
        Url::parse(SOURCE_URL).unwrap(),
        Url::parse("https://wanco.ac.jp").unwrap(),
    )
}

pub fn state_with(transport: Arc<MockTransport>) -> AppState {
    AppState::new(scraper_with(transport, Duration::from_secs(3600)))
}

/// Wrap a single listing block in a minimal page.
pub fn page_with_block(dt: &str, dd: &str) -> String {
    format!(
        r#"<html><body><div class="newsList"><div class="cFix"><dt>{dt}</dt><dd>{dd}</dd></div></div></body></html>"#
    )
}
