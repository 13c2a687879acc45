// src/scrape/normalizer.rs
//! Candidate → canonical [`Event`].
//!
//! The only rejection rule is the date: a candidate whose raw date does not
//! parse to a real calendar date is dropped. Everything else is carried over.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::types::{CandidateRecord, Event, SOURCE_TAG};

/// Ids longer than this are cut.
pub const EVENT_ID_MAX_LEN: usize = 32;

/// A raw date resolved to a UTC instant and its calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub date: NaiveDate,
    pub timestamp_ms: i64,
}

/// Accepts `YYYY-MM-DD` (also with `/` or `.`), RFC 3339 and RFC 2822.
/// Date-only inputs are taken as UTC midnight.
pub fn parse_date(raw: &str) -> Option<ParsedDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
            return Some(ParsedDate {
                date,
                timestamp_ms: midnight.timestamp_millis(),
            });
        }
    }

    let instant = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()?
        .with_timezone(&Utc);
    Some(ParsedDate {
        date: instant.date_naive(),
        timestamp_ms: instant.timestamp_millis(),
    })
}

/// Order-dependent character-code sum over UTF-16 units (`h * 31 + c`).
fn title_hash(title: &str) -> u32 {
    title
        .encode_utf16()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(u32::from(c)))
}

/// `event_{timestamp_ms}_{title_hash}`, cut to [`EVENT_ID_MAX_LEN`] chars.
/// Deterministic for equal (title, date); not collision-proof.
pub fn event_id(title: &str, date: &ParsedDate) -> String {
    let mut id = format!("event_{}_{}", date.timestamp_ms, title_hash(title));
    id.truncate(EVENT_ID_MAX_LEN); // ASCII only, so byte cut is a char cut
    id
}

/// `None` when the date does not parse; never panics.
pub fn normalize_to_event(candidate: &CandidateRecord) -> Option<Event> {
    let parsed = parse_date(&candidate.raw_date)?;

    let description = candidate
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(candidate.title.as_str())
        .to_string();

    Some(Event {
        id: event_id(&candidate.title, &parsed),
        title: candidate.title.clone(),
        description,
        date: parsed.date.format("%Y-%m-%d").to_string(),
        url: candidate.url.clone(),
        category: candidate.category.clone(),
        image_url: candidate.image_url.clone(),
        source: SOURCE_TAG.to_string(),
        scraped_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, raw_date: &str) -> CandidateRecord {
        CandidateRecord {
            title: title.to_string(),
            url: "https://wanco.ac.jp/news/1.html".to_string(),
            raw_date: raw_date.to_string(),
            description: None,
            category: Some("イベント".to_string()),
            image_url: None,
        }
    }

    #[test]
    fn rejects_unparseable_dates() {
        for raw in ["", "   ", "TBD", "2024-13-01", "2024-02-30", "15/03/2024", "近日公開"] {
            assert!(
                normalize_to_event(&candidate("Title", raw)).is_none(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn canonical_date_drops_time_component() {
        let ev = normalize_to_event(&candidate("T", "2024-03-15T23:30:00+09:00")).unwrap();
        assert_eq!(ev.date, "2024-03-15");

        // Converted to UTC first, like the timestamp.
        let ev = normalize_to_event(&candidate("T", "2024-03-16T01:00:00+09:00")).unwrap();
        assert_eq!(ev.date, "2024-03-15");

        let ev = normalize_to_event(&candidate("T", "Fri, 15 Mar 2024 10:00:00 +0000")).unwrap();
        assert_eq!(ev.date, "2024-03-15");

        let ev = normalize_to_event(&candidate("T", "2024/03/15")).unwrap();
        assert_eq!(ev.date, "2024-03-15");
    }

    #[test]
    fn ids_are_deterministic_for_same_title_and_date() {
        let a = normalize_to_event(&candidate("Open Campus Day", "2024-03-15")).unwrap();
        let b = normalize_to_event(&candidate("Open Campus Day", " 2024-03-15 ")).unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("event_1710460800000_"), "id: {}", a.id);
        assert!(a.id.len() <= EVENT_ID_MAX_LEN);
    }

    #[test]
    fn ids_differ_by_title_order_and_date() {
        let d = parse_date("2024-03-15").unwrap();
        assert_ne!(event_id("ab", &d), event_id("ba", &d));
        let d2 = parse_date("2024-03-16").unwrap();
        assert_ne!(event_id("ab", &d), event_id("ab", &d2));
    }

    #[test]
    fn description_falls_back_to_title_and_provenance_is_stamped() {
        let mut c = candidate("Open Campus Day", "2024-03-15");
        c.description = Some("  ".to_string());
        let ev = normalize_to_event(&c).unwrap();
        assert_eq!(ev.description, "Open Campus Day");
        assert_eq!(ev.source, SOURCE_TAG);
        assert_eq!(ev.category.as_deref(), Some("イベント"));
        assert!(DateTime::parse_from_rfc3339(&ev.scraped_at).is_ok());
    }
}
