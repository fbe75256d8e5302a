//! Page fetching and item extraction
//!
//! This module covers the first half of the pipeline:
//! - Static HTTP fetching with a browser-rendered fallback for
//!   script-heavy pages
//! - Extraction of typed raw items (text, links, images, videos) from
//!   rendered HTML

mod browser;
mod extractor;
mod fetcher;

pub use extractor::{candidate_count, extract, filter_by_keyword, is_video_embed};
pub use fetcher::Fetcher;

use url::Url;

/// The kind of data a job extracts from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Text,
    Links,
    Images,
    Videos,
}

impl DataType {
    /// Parses the configuration/database spelling of a data type
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Text" => Some(Self::Text),
            "Links" => Some(Self::Links),
            "Images" => Some(Self::Images),
            "Videos" => Some(Self::Videos),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Links => "Links",
            Self::Images => "Images",
            Self::Videos => "Videos",
        }
    }

    /// True for types whose items are URLs rather than prose
    pub fn is_url_type(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page after fetching, ready for extraction
#[derive(Debug, Clone)]
pub struct RenderedContent {
    /// Final URL after redirects
    pub url: Url,

    /// The rendered HTML body
    pub html: String,

    /// Whether the browser fallback produced this content
    pub via_browser: bool,
}

/// A single extracted item, before cleaning
///
/// Transient: raw items flow into the cleaning pipeline and are never
/// persisted directly.
#[derive(Debug, Clone)]
pub struct RawItem {
    /// URL of the page the item came from
    pub source_url: String,

    pub data_type: DataType,

    /// The extracted value: trimmed text, or an absolute URL
    pub value: String,

    /// Zero-based position in extraction order
    pub position: usize,
}
