// src/scrape/mod.rs
pub mod fetcher;
pub mod normalizer;
pub mod parser;
pub mod types;

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use thiserror::Error;
use url::Url;

use crate::cache::{EventCache, EVENTS_CACHE_KEY};
use crate::config::ServiceConfig;
use fetcher::{FetchError, Fetcher};
use types::Event;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_runs_total", "Scrape pipeline runs started.");
        describe_counter!(
            "scrape_failures_total",
            "Scrape runs that failed because the page could not be fetched."
        );
        describe_counter!(
            "scrape_fetch_retries_total",
            "Fetch attempts that failed and were retried."
        );
        describe_counter!(
            "scrape_candidates_total",
            "Listing blocks extracted by the parser."
        );
        describe_counter!(
            "scrape_events_kept_total",
            "Candidates that normalized into events."
        );
        describe_counter!(
            "scrape_events_dropped_total",
            "Candidates dropped for an unparseable date."
        );
        describe_histogram!("scrape_parse_ms", "Parse + normalize time in milliseconds.");
        describe_gauge!(
            "scrape_last_success_ts",
            "Unix ts of the last successful scrape."
        );
    });
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to scrape news")]
    Fetch(#[source] FetchError),
}

/// Parse + normalize a fetched page. Cannot fail; bad items are dropped.
pub fn extract_events(html: &str, base: &Url) -> Vec<Event> {
    let t0 = std::time::Instant::now();
    let candidates = parser::parse_news_page(html, base);
    let total = candidates.len();

    let events: Vec<Event> = candidates
        .iter()
        .filter_map(normalizer::normalize_to_event)
        .collect();

    let dropped = total - events.len();
    if dropped > 0 {
        tracing::debug!(target: "scrape", dropped, "dropped candidates with unparseable dates");
    }

    histogram!("scrape_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("scrape_candidates_total").increment(total as u64);
    counter!("scrape_events_kept_total").increment(events.len() as u64);
    counter!("scrape_events_dropped_total").increment(dropped as u64);
    events
}

/// Fetch → parse → normalize → cache, driven by the request layer.
///
/// Concurrent misses each run the full pipeline; the last `set` wins.
pub struct Scraper {
    fetcher: Fetcher,
    cache: Arc<EventCache>,
    source_url: Url,
    base: Url,
    last_scraped_at: RwLock<DateTime<Utc>>,
}

impl Scraper {
    pub fn new(fetcher: Fetcher, cache: Arc<EventCache>, source_url: Url, base: Url) -> Self {
        Self {
            fetcher,
            cache,
            source_url,
            base,
            last_scraped_at: RwLock::new(DateTime::<Utc>::default()),
        }
    }

    /// Production wiring: reqwest fetcher and URLs from config.
    pub fn from_config(cfg: &ServiceConfig, cache: Arc<EventCache>) -> anyhow::Result<Self> {
        Ok(Self::new(
            Fetcher::from_config(cfg)?,
            cache,
            cfg.source()?,
            cfg.base()?,
        ))
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    /// Epoch until the first successful run.
    pub fn last_scraped_at(&self) -> DateTime<Utc> {
        *self
            .last_scraped_at
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Run the whole pipeline and install the result as the new snapshot.
    /// On failure the existing snapshot is left as it was.
    pub async fn scrape_and_refresh(&self) -> Result<Arc<Vec<Event>>, ScrapeError> {
        ensure_metrics_described();
        counter!("scrape_runs_total").increment(1);
        let t0 = std::time::Instant::now();

        let html = match self.fetcher.fetch_page(self.source_url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                counter!("scrape_failures_total").increment(1);
                tracing::error!(target: "scrape", error = %e, url = %self.source_url, "scraping failed");
                return Err(ScrapeError::Fetch(e));
            }
        };

        let events = extract_events(&html, &self.base);
        let kept = events.len();
        let snapshot = self.cache.set(EVENTS_CACHE_KEY, events);

        let now = Utc::now();
        *self
            .last_scraped_at
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = now;
        gauge!("scrape_last_success_ts").set(now.timestamp() as f64);

        tracing::info!(
            target: "scrape",
            kept,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "scrape completed"
        );
        Ok(snapshot)
    }

    /// Cached snapshot, scraping first on a miss.
    pub async fn events(&self) -> Result<Arc<Vec<Event>>, ScrapeError> {
        match self.cache.get(EVENTS_CACHE_KEY) {
            Some(hit) => Ok(hit),
            None => self.scrape_and_refresh().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_keeps_only_dated_items_in_page_order() {
        let html = r#"
            <div class="cFix"><dt>2024-03-15</dt><dd><a href="/n/1">First</a></dd></div>
            <div class="cFix"><dt>TBD</dt><dd><a href="/n/2">Undated</a></dd></div>
            <div class="cFix"><dt>2024-01-09</dt><dd><a href="/n/3">Third</a></dd></div>
        "#;
        let base = Url::parse("https://wanco.ac.jp").unwrap();
        let events = extract_events(html, &base);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["First", "Third"]);
    }
}
