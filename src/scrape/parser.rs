// src/scrape/parser.rs
//! Listing-page parser.
//!
//! The WAnco news page wraps every item in a `div.cFix` holding a direct `dt`
//! (date + category icon) and a direct `dd` (headline link). There is no
//! enclosing `dl`. Each block is handled on its own; a block that does not
//! have the expected shape is skipped without affecting its neighbours.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::types::CandidateRecord;

/// Max description length (in chars) before an ellipsis is appended.
pub const DESCRIPTION_MAX_CHARS: usize = 100;

static BLOCK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.cFix").expect("block selector"));
static CATEGORY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.ico > img").expect("category selector"));
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("link selector"));
static IMAGE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("image selector"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("date regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Extract candidate records from the raw page, in document order.
pub fn parse_news_page(html: &str, base: &Url) -> Vec<CandidateRecord> {
    let document = Html::parse_document(html);
    let total = document.select(&BLOCK_SEL).count();

    let out: Vec<CandidateRecord> = document
        .select(&BLOCK_SEL)
        .filter_map(|block| parse_block(block, base))
        .collect();

    if out.len() < total {
        tracing::debug!(
            target: "scrape",
            blocks = total,
            kept = out.len(),
            "skipped malformed listing blocks"
        );
    }
    out
}

fn parse_block(block: ElementRef<'_>, base: &Url) -> Option<CandidateRecord> {
    let meta = direct_child(block, "dt")?;
    let content = direct_child(block, "dd")?;

    let category = meta
        .select(&CATEGORY_SEL)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string);

    let meta_text = collapse_ws(&meta.text().collect::<String>());
    let raw_date = match DATE_RE.captures(&meta_text) {
        Some(caps) => format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]),
        None => meta_text,
    };

    let link = content.select(&LINK_SEL).next()?;
    let title = collapse_ws(&link.text().collect::<String>());
    let href = link.value().attr("href").map(str::trim).unwrap_or_default();
    if title.is_empty() || href.is_empty() {
        return None;
    }
    let url = base.join(href).ok()?;

    // An unusable image never costs us the item.
    let image_url = content
        .select(&IMAGE_SEL)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .and_then(|src| base.join(src).ok())
        .map(String::from);

    Some(CandidateRecord {
        description: Some(truncate_description(&title)),
        title,
        url: url.into(),
        raw_date,
        category,
        image_url,
    })
}

fn direct_child<'a>(parent: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Title verbatim when short enough, else the first 100 chars plus `...`.
pub fn truncate_description(title: &str) -> String {
    if title.chars().count() > DESCRIPTION_MAX_CHARS {
        let mut out: String = title.chars().take(DESCRIPTION_MAX_CHARS).collect();
        out.push_str("...");
        out
    } else {
        title.to_string()
    }
}
