//! HTML item extraction
//!
//! Turns rendered HTML into typed [`RawItem`]s:
//! - Text: block-level text nodes (paragraphs and headings), trimmed
//! - Links: anchor targets resolved against the page URL
//! - Images: image sources, deduplicated by exact URL
//! - Videos: native video/source elements plus recognized embed iframes
//!
//! Malformed fragments are skipped, never fatal: an unparseable href or
//! selector miss drops that item and extraction continues.

use crate::scraper::{DataType, RawItem};
use crate::url::{has_disallowed_scheme, normalize_url};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Hosts/path prefixes recognized as embedded video players
const VIDEO_EMBED_PATTERNS: &[&str] = &[
    "youtube.com/embed/",
    "youtube-nocookie.com/embed/",
    "player.vimeo.com/video/",
    "dailymotion.com/embed/",
];

/// Counts candidate elements for a data type in a parsed page
///
/// This is the browser-fallback signal: a static fetch of a
/// script-rendered page typically parses fine but yields zero candidates
/// for the requested type.
pub fn candidate_count(html: &str, data_type: DataType) -> usize {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(candidate_selector(data_type)) {
        Ok(s) => s,
        Err(_) => return 0,
    };
    document.select(&selector).count()
}

fn candidate_selector(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Text => "p, h1, h2, h3, h4, h5, h6",
        DataType::Links => "a[href]",
        DataType::Images => "img[src]",
        DataType::Videos => "video[src], video source[src], iframe[src]",
    }
}

/// Extracts raw items of the requested type from rendered HTML
pub fn extract(html: &str, page_url: &Url, data_type: DataType) -> Vec<RawItem> {
    let document = Html::parse_document(html);

    let values = match data_type {
        DataType::Text => extract_text(&document),
        DataType::Links => extract_links(&document, page_url),
        DataType::Images => extract_images(&document, page_url),
        DataType::Videos => extract_videos(&document, page_url),
    };

    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| RawItem {
            source_url: page_url.to_string(),
            data_type,
            value,
            position,
        })
        .collect()
}

/// Retains items whose value contains the keyword, case-insensitively
///
/// Applied after extraction and before cleaning, so the keyword matches
/// against raw values; `items_scraped` in run statistics counts items
/// surviving this filter.
pub fn filter_by_keyword(items: Vec<RawItem>, keyword: &str) -> Vec<RawItem> {
    let needle = keyword.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.value.to_lowercase().contains(&needle))
        .collect()
}

fn extract_text(document: &Html) -> Vec<String> {
    let mut values = Vec::new();

    if let Ok(selector) = Selector::parse("p, h1, h2, h3, h4, h5, h6") {
        for element in document.select(&selector) {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                values.push(text);
            }
        }
    }

    values
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let mut values = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve(href, page_url) {
                    values.push(url);
                }
            }
        }
    }

    values
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut values = Vec::new();
    // Exact-URL dedup only; semantic dedup happens in the cleaning pipeline
    let mut seen = HashSet::new();

    if let Ok(selector) = Selector::parse("img[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                if let Some(url) = resolve(src, page_url) {
                    if seen.insert(url.clone()) {
                        values.push(url);
                    }
                }
            }
        }
    }

    values
}

fn extract_videos(document: &Html, page_url: &Url) -> Vec<String> {
    let mut values = Vec::new();

    if let Ok(selector) = Selector::parse("video[src], video source[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                if let Some(url) = resolve(src, page_url) {
                    values.push(url);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("iframe[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                if let Some(url) = resolve(src, page_url) {
                    if is_video_embed(&url) {
                        values.push(url);
                    }
                }
            }
        }
    }

    values
}

/// Resolves a raw attribute value to an absolute URL, or skips it
fn resolve(raw: &str, page_url: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || has_disallowed_scheme(raw) {
        return None;
    }

    normalize_url(raw, Some(page_url))
        .ok()
        .map(|url| url.to_string())
}

/// Returns true if a URL matches a known embedded-video pattern
pub fn is_video_embed(url: &str) -> bool {
    let lower = url.to_lowercase();
    VIDEO_EMBED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
