//! Cleaning pipeline for extracted items
//!
//! A pipeline is an ordered sequence of steps from a closed set, each
//! carrying a typed options record. Steps are pure transformations over
//! the item sequence, applied in declared order. A step that fails for a
//! single item (for example a URL that stops parsing after an earlier
//! transformation) discards that item only; the run continues.

use crate::scraper::{DataType, RawItem};
use crate::url::{normalize_url_with, NormalizeOptions};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Options for the `clean_text` step
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Collapse runs of whitespace and trim the ends
    pub strip_whitespace: bool,

    /// Decode HTML entities (`&amp;` and friends)
    pub decode_html: bool,

    /// Replace newlines with spaces before whitespace collapsing
    pub remove_newlines: bool,

    pub lowercase: bool,

    /// Drop everything but alphanumerics, underscores, and whitespace
    pub remove_punctuation: bool,

    /// Drop decimal digits
    pub remove_numbers: bool,

    /// Strip embedded http(s) URLs out of the text
    pub remove_urls: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            strip_whitespace: true,
            decode_html: true,
            remove_newlines: false,
            lowercase: false,
            remove_punctuation: false,
            remove_numbers: false,
            remove_urls: false,
        }
    }
}

/// Options for the `clean_url` step
///
/// The host is always lower-cased and default ports stripped; these
/// options control the extra stripping on top of that.
#[derive(Debug, Clone)]
pub struct UrlOptions {
    pub remove_query: bool,
    pub remove_fragment: bool,
    pub remove_trailing_slash: bool,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            remove_query: false,
            remove_fragment: true,
            remove_trailing_slash: true,
        }
    }
}

/// One step in a cleaning pipeline
///
/// The set of step kinds is closed and each carries typed options, so a
/// pipeline is dispatched by plain match rather than name lookup.
#[derive(Debug, Clone)]
pub enum CleanStep {
    /// Normalize prose; applies to Text items only
    CleanText(TextOptions),

    /// Normalize URL values; applies to Links/Images/Videos items only
    CleanUrl(UrlOptions),

    /// Drop items whose cleaned value length is outside [min, max]
    FilterByLength {
        min: Option<usize>,
        max: Option<usize>,
    },

    /// Keep (or drop, when `keep` is false) items matching the pattern
    FilterByPattern { pattern: Regex, keep: bool },

    /// Data-type-specific structural check
    Validate,

    /// Drop items equal to an earlier item; first occurrence wins
    RemoveDuplicates { case_sensitive: bool },
}

/// An item after cleaning, carrying both raw and cleaned values
#[derive(Debug, Clone)]
pub struct CleanedItem {
    pub source_url: String,
    pub data_type: DataType,
    pub raw_value: String,
    pub cleaned_value: String,
    pub position: usize,
}

/// Output of a pipeline run, with counts for run statistics
#[derive(Debug)]
pub struct PipelineOutput {
    pub items: Vec<CleanedItem>,
    pub raw_count: usize,
    pub cleaned_count: usize,
}

/// An ordered cleaning pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<CleanStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<CleanStep>) -> Self {
        Self { steps }
    }

    /// The default pipeline for a data type
    ///
    /// Text: clean_text → filter_by_length(min=3) → validate →
    /// remove_duplicates (case-insensitive).
    /// URL types: clean_url → validate → remove_duplicates
    /// (case-insensitive).
    pub fn default_for(data_type: DataType) -> Self {
        let steps = match data_type {
            DataType::Text => vec![
                CleanStep::CleanText(TextOptions::default()),
                CleanStep::FilterByLength {
                    min: Some(3),
                    max: None,
                },
                CleanStep::Validate,
                CleanStep::RemoveDuplicates {
                    case_sensitive: false,
                },
            ],
            _ => vec![
                CleanStep::CleanUrl(UrlOptions::default()),
                CleanStep::Validate,
                CleanStep::RemoveDuplicates {
                    case_sensitive: false,
                },
            ],
        };
        Self::new(steps)
    }

    /// Runs every step in order over the items
    pub fn run(&self, items: Vec<RawItem>) -> PipelineOutput {
        let raw_count = items.len();

        let mut current: Vec<CleanedItem> = items
            .into_iter()
            .map(|item| CleanedItem {
                source_url: item.source_url,
                data_type: item.data_type,
                cleaned_value: item.value.clone(),
                raw_value: item.value,
                position: item.position,
            })
            .collect();

        for step in &self.steps {
            let before = current.len();
            current = apply_step(step, current);
            tracing::debug!(
                "Cleaning step {:?}: {} -> {} items",
                step_name(step),
                before,
                current.len()
            );
        }

        let cleaned_count = current.len();
        PipelineOutput {
            items: current,
            raw_count,
            cleaned_count,
        }
    }
}

fn step_name(step: &CleanStep) -> &'static str {
    match step {
        CleanStep::CleanText(_) => "clean_text",
        CleanStep::CleanUrl(_) => "clean_url",
        CleanStep::FilterByLength { .. } => "filter_by_length",
        CleanStep::FilterByPattern { .. } => "filter_by_pattern",
        CleanStep::Validate => "validate",
        CleanStep::RemoveDuplicates { .. } => "remove_duplicates",
    }
}

fn apply_step(step: &CleanStep, items: Vec<CleanedItem>) -> Vec<CleanedItem> {
    match step {
        CleanStep::CleanText(opts) => items
            .into_iter()
            .map(|mut item| {
                if item.data_type == DataType::Text {
                    item.cleaned_value = clean_text(&item.cleaned_value, opts);
                }
                item
            })
            .collect(),

        CleanStep::CleanUrl(opts) => items
            .into_iter()
            .filter_map(|mut item| {
                if !item.data_type.is_url_type() {
                    return Some(item);
                }
                match clean_url(&item.cleaned_value, opts) {
                    Some(cleaned) => {
                        item.cleaned_value = cleaned;
                        Some(item)
                    }
                    // Unparseable URL: drop this item, keep the rest
                    None => None,
                }
            })
            .collect(),

        CleanStep::FilterByLength { min, max } => items
            .into_iter()
            .filter(|item| {
                let len = item.cleaned_value.chars().count();
                if let Some(min) = min {
                    if len < *min {
                        return false;
                    }
                }
                if let Some(max) = max {
                    if len > *max {
                        return false;
                    }
                }
                true
            })
            .collect(),

        CleanStep::FilterByPattern { pattern, keep } => items
            .into_iter()
            .filter(|item| pattern.is_match(&item.cleaned_value) == *keep)
            .collect(),

        CleanStep::Validate => items
            .into_iter()
            .filter(|item| validate(&item.cleaned_value, item.data_type))
            .collect(),

        CleanStep::RemoveDuplicates { case_sensitive } => {
            let mut seen = HashSet::new();
            items
                .into_iter()
                .filter(|item| {
                    let key = if *case_sensitive {
                        item.cleaned_value.clone()
                    } else {
                        item.cleaned_value.to_lowercase()
                    };
                    seen.insert(key)
                })
                .collect()
        }
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

/// Cleans a single text value according to the options
pub fn clean_text(text: &str, opts: &TextOptions) -> String {
    let mut cleaned = text.to_string();

    if opts.decode_html {
        cleaned = html_escape::decode_html_entities(&cleaned).into_owned();
    }

    if opts.remove_urls {
        cleaned = url_pattern().replace_all(&cleaned, "").into_owned();
    }

    if opts.remove_newlines {
        cleaned = cleaned.replace(['\n', '\r'], " ");
    }

    if opts.strip_whitespace {
        cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if opts.lowercase {
        cleaned = cleaned.to_lowercase();
    }

    if opts.remove_punctuation {
        cleaned.retain(|c| c.is_alphanumeric() || c == '_' || c.is_whitespace());
    }

    if opts.remove_numbers {
        cleaned.retain(|c| !c.is_ascii_digit());
    }

    cleaned
}

/// Cleans a single URL value; None means the value is not a usable URL
pub fn clean_url(value: &str, opts: &UrlOptions) -> Option<String> {
    let normalize_opts = NormalizeOptions {
        strip_query: opts.remove_query,
        strip_fragment: opts.remove_fragment,
        strip_trailing_slash: opts.remove_trailing_slash,
    };
    normalize_url_with(value, None, &normalize_opts)
        .ok()
        .map(|url| url.to_string())
}

/// Known-good image file extensions for structural validation
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "avif"];

/// Structural validity check per data type
pub fn validate(value: &str, data_type: DataType) -> bool {
    if value.is_empty() {
        return false;
    }

    match data_type {
        DataType::Text => value.trim().chars().count() >= 3,
        DataType::Links => is_wellformed_http_url(value),
        DataType::Images => {
            is_wellformed_http_url(value) && has_allowed_extension(value, IMAGE_EXTENSIONS)
        }
        DataType::Videos => is_wellformed_http_url(value),
    }
}

fn is_wellformed_http_url(value: &str) -> bool {
    crate::url::normalize_url(value, None).is_ok()
}

/// Accepts values with no file extension; rejects values whose final
/// path segment carries an extension outside the allowed set
fn has_allowed_extension(value: &str, allowed: &[&str]) -> bool {
    let path = match url::Url::parse(value) {
        Ok(url) => url.path().to_string(),
        Err(_) => return false,
    };

    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => allowed.contains(&ext.to_lowercase().as_str()),
        None => true,
    }
}
