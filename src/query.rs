// src/query.rs
//! List query for `GET /api/events`: category filter, sort, pagination.
//!
//! Parameters are parsed leniently; bad values fall back to defaults instead
//! of producing an error.

use serde::Serialize;

use crate::scrape::types::Event;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;

/// Raw query string, all fields optional text.
#[derive(Debug, Default, Clone)]
pub struct EventsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl EventsQuery {
    /// Fold decoded `key=value` pairs. The first occurrence of a key wins and
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut q = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut q.page,
                "limit" => &mut q.limit,
                "category" => &mut q.category,
                "sort" => &mut q.sort,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        q
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DateDesc,
    DateAsc,
    Title,
    /// Unknown value: keep cache order.
    Unsorted,
}

impl SortOrder {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("date_desc") => Self::DateDesc,
            Some("date_asc") => Self::DateAsc,
            Some("title") => Self::Title,
            Some(_) => Self::Unsorted,
        }
    }
}

/// Resolved query with defaults and bounds applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub sort: SortOrder,
}

impl From<&EventsQuery> for ListParams {
    fn from(q: &EventsQuery) -> Self {
        let page = lenient_int(q.page.as_deref(), DEFAULT_PAGE).max(1);
        let limit = lenient_int(q.limit.as_deref(), DEFAULT_LIMIT).clamp(1, i64::from(MAX_LIMIT));
        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: limit as u32, // clamped above
            category: q.category.clone().filter(|c| !c.is_empty()),
            sort: SortOrder::parse(q.sort.as_deref()),
        }
    }
}

/// Missing, non-numeric or zero → `default`.
fn lenient_int(raw: Option<&str>, default: u32) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
        .unwrap_or(i64::from(default))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventsPage {
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub events: Vec<Event>,
}

/// Filter, sort and slice a snapshot. `total` counts matches before paging.
pub fn apply(events: &[Event], params: &ListParams) -> EventsPage {
    let mut filtered: Vec<Event> = match &params.category {
        Some(cat) => events
            .iter()
            .filter(|e| e.category.as_deref() == Some(cat.as_str()))
            .cloned()
            .collect(),
        None => events.to_vec(),
    };

    // `date` is `YYYY-MM-DD`, so string order is date order.
    match params.sort {
        SortOrder::DateAsc => filtered.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::DateDesc => filtered.sort_by(|a, b| b.date.cmp(&a.date)),
        // Code-point order, not Japanese collation: Latin sorts before kana/kanji.
        SortOrder::Title => filtered.sort_by(|a, b| a.title.cmp(&b.title)),
        SortOrder::Unsorted => {}
    }

    let total = filtered.len();
    let start = (params.page as usize - 1).saturating_mul(params.limit as usize);
    let events = filtered
        .into_iter()
        .skip(start)
        .take(params.limit as usize)
        .collect();

    EventsPage {
        total,
        page: params.page,
        limit: params.limit,
        events,
    }
}
