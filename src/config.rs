// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::scrape::fetcher::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "SCRAPER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/scraper.toml";

pub const ENV_SOURCE_URL: &str = "SCRAPER_SOURCE_URL";
pub const ENV_BASE_ORIGIN: &str = "SCRAPER_BASE_ORIGIN";
pub const ENV_USER_AGENT: &str = "SCRAPER_USER_AGENT";
pub const ENV_TIMEOUT_MS: &str = "SCRAPER_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "SCRAPER_MAX_RETRIES";
pub const ENV_BACKOFF_MS: &str = "SCRAPER_BACKOFF_MS";
pub const ENV_CACHE_TTL_SECS: &str = "EVENTS_CACHE_TTL_SECS";

pub const DEFAULT_SOURCE_URL: &str = "https://wanco.ac.jp/news/";
pub const DEFAULT_BASE_ORIGIN: &str = "https://wanco.ac.jp";
pub const DEFAULT_USER_AGENT: &str =
    "Pet-News-Events-Bot/1.0 (+https://github.com/allface017/pet-news-events)";

/// Runtime settings for the scraper and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub source_url: String,
    pub base_origin: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            base_origin: DEFAULT_BASE_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: 10_000,
            max_retries: 3,
            backoff_ms: 1_000,
            cache_ttl_secs: 3_600,
        }
    }
}

impl ServiceConfig {
    /// Load from an explicit TOML file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scraper config from {}", path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("parsing scraper config {}", path.display()))?;
        cfg.with_env_overrides().validated()
    }

    /// Load using env var + fallbacks:
    /// 1) $SCRAPER_CONFIG_PATH (must exist)
    /// 2) config/scraper.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Self::default().with_env_overrides().validated()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_string(ENV_SOURCE_URL) {
            self.source_url = v;
        }
        if let Some(v) = env_string(ENV_BASE_ORIGIN) {
            self.base_origin = v;
        }
        if let Some(v) = env_string(ENV_USER_AGENT) {
            self.user_agent = v;
        }
        // Unparseable numbers keep the previous value.
        if let Some(v) = env_parse(ENV_TIMEOUT_MS) {
            self.timeout_ms = v;
        }
        if let Some(v) = env_parse(ENV_MAX_RETRIES) {
            self.max_retries = v;
        }
        if let Some(v) = env_parse(ENV_BACKOFF_MS) {
            self.backoff_ms = v;
        }
        if let Some(v) = env_parse(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = v;
        }
        self
    }

    fn validated(self) -> Result<Self> {
        self.source()?;
        self.base()?;
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be > 0");
        }
        Ok(self)
    }

    pub fn source(&self) -> Result<Url> {
        Url::parse(&self.source_url).with_context(|| format!("invalid source_url {:?}", self.source_url))
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_origin)
            .with_context(|| format!("invalid base_origin {:?}", self.base_origin))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_ms),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|s| s.parse().ok())
}
