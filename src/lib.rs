// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod query;
pub mod scrape;

pub use crate::api::{create_router, AppState};
pub use crate::cache::{EventCache, EVENTS_CACHE_KEY};
pub use crate::config::ServiceConfig;
pub use crate::scrape::types::Event;
pub use crate::scrape::{ScrapeError, Scraper};

use std::sync::Arc;

/// Build the full app state from config: one cache, one scraper.
pub fn build_state(cfg: &ServiceConfig) -> anyhow::Result<AppState> {
    let cache = Arc::new(EventCache::new(cfg.cache_ttl()));
    let scraper = Scraper::from_config(cfg, cache)?;
    Ok(AppState::new(scraper))
}
