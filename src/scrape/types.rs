// src/scrape/types.rs
use serde::{Deserialize, Serialize};

/// Provenance tag stamped on every event scraped from the WAnco news page.
pub const SOURCE_TAG: &str = "wanco";

/// Unvalidated fields pulled out of one listing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub url: String,      // already absolute
    pub raw_date: String, // not yet validated
    pub description: Option<String>,
    pub category: Option<String>, // e.g. "イベント", "お知らせ"
    pub image_url: Option<String>,
}

/// Canonical event served by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`, no time component.
    pub date: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub source: String,
    /// RFC 3339, UTC.
    pub scraped_at: String,
}
