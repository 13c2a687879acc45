//! # Event Cache
//! In-memory, named snapshots of the scraped event list with an absolute TTL.
//!
//! - `set` replaces the whole snapshot for a name (no merging).
//! - `get`/`age` evict an expired entry in the same lock scope that observed it.
//! - No background sweep; eviction is lazy.
//!
//! Time comes from `tokio::time::Instant` so paused-clock tests can step past
//! the TTL without sleeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::scrape::types::Event;

/// Name of the one slot holding the scraped event list.
pub const EVENTS_CACHE_KEY: &str = "events";

#[derive(Debug)]
struct Entry {
    data: Arc<Vec<Event>>,
    stored_at: Instant,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Thread-safe TTL cache for event snapshots.
#[derive(Debug)]
pub struct EventCache {
    inner: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl EventCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `events` under `key`, fully replacing any previous snapshot.
    pub fn set(&self, key: &str, events: Vec<Event>) -> Arc<Vec<Event>> {
        let now = Instant::now();
        let data = Arc::new(events);
        self.lock().insert(
            key.to_string(),
            Entry {
                data: Arc::clone(&data),
                stored_at: now,
                expires_at: now.checked_add(self.ttl),
            },
        );
        data
    }

    /// Live snapshot for `key`, or `None` (evicting it if it has expired).
    pub fn get(&self, key: &str) -> Option<Arc<Vec<Event>>> {
        let now = Instant::now();
        let mut map = self.lock();
        let entry = live_entry(&mut map, key, now)?;
        Some(Arc::clone(&entry.data))
    }

    /// Milliseconds since the snapshot for `key` was stored; `None` if there is
    /// no live entry.
    pub fn age(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let mut map = self.lock();
        let entry = live_entry(&mut map, key, now)?;
        let age = now.saturating_duration_since(entry.stored_at);
        Some(u64::try_from(age.as_millis()).unwrap_or(u64::MAX))
    }

    /// Remove one entry, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        let mut map = self.lock();
        match key {
            Some(k) => {
                map.remove(k);
            }
            None => map.clear(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // The map stays consistent even if a holder panicked mid-call.
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn live_entry<'a>(
    map: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a Entry> {
    if map.get(key)?.is_expired(now) {
        map.remove(key);
        tracing::debug!(target: "cache", key, "evicted expired snapshot");
        return None;
    }
    map.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: &str) -> Event {
        Event {
            id: id.to_string(),
            title: format!("title {id}"),
            description: format!("title {id}"),
            date: "2024-03-15".to_string(),
            url: format!("https://wanco.ac.jp/news/{id}.html"),
            category: None,
            image_url: None,
            source: "wanco".to_string(),
            scraped_at: "2024-03-15T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_exact_snapshot_until_ttl_elapses() {
        let cache = EventCache::new(Duration::from_secs(60));
        let events = vec![ev("a"), ev("b")];
        cache.set(EVENTS_CACHE_KEY, events.clone());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(EVENTS_CACHE_KEY).as_deref(), Some(&events));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(EVENTS_CACHE_KEY).is_none());
        assert!(cache.age(EVENTS_CACHE_KEY).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn age_stays_within_ttl_while_live() {
        let cache = EventCache::new(Duration::from_secs(10));
        assert_eq!(cache.age(EVENTS_CACHE_KEY), None);

        cache.set(EVENTS_CACHE_KEY, vec![ev("a")]);
        assert_eq!(cache.age(EVENTS_CACHE_KEY), Some(0));

        tokio::time::advance(Duration::from_millis(4_250)).await;
        assert_eq!(cache.age(EVENTS_CACHE_KEY), Some(4_250));

        tokio::time::advance(Duration::from_millis(5_750)).await;
        let age = cache.age(EVENTS_CACHE_KEY).expect("still live at exactly ttl");
        assert!(age <= 10_000);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.age(EVENTS_CACHE_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_and_restarts_ttl() {
        let cache = EventCache::new(Duration::from_secs(10));
        cache.set(EVENTS_CACHE_KEY, vec![ev("a"), ev("b")]);
        tokio::time::advance(Duration::from_secs(8)).await;

        cache.set(EVENTS_CACHE_KEY, vec![ev("c")]);
        tokio::time::advance(Duration::from_secs(8)).await;

        let got = cache.get(EVENTS_CACHE_KEY).expect("fresh after overwrite");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_never_expires() {
        let cache = EventCache::new(Duration::from_secs(u64::MAX));
        let stored = cache.set(EVENTS_CACHE_KEY, vec![ev("a")]);
        assert_eq!(stored.len(), 1);

        tokio::time::advance(Duration::from_secs(10 * 365 * 24 * 3600)).await;
        assert!(cache.get(EVENTS_CACHE_KEY).is_some());
        assert!(cache.age(EVENTS_CACHE_KEY).is_some());
    }

    #[test]
    fn clear_one_or_all() {
        let cache = EventCache::new(Duration::from_secs(3600));
        cache.set("events", vec![ev("a")]);
        cache.set("other", vec![ev("b")]);

        cache.clear(Some("events"));
        assert!(cache.get("events").is_none());
        assert!(cache.get("other").is_some());

        cache.clear(None);
        assert!(cache.get("other").is_none());
    }
}
