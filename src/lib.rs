//! ScrapeMaster: a scheduled web scraping pipeline
//!
//! This crate implements the scrape-execute pipeline and recurring-job
//! scheduler: URL normalization, static fetching with a browser-rendered
//! fallback, typed extraction, a configurable cleaning pipeline, deduplicated
//! media downloads under storage quotas, and the job state machine driving it.

pub mod cleaning;
pub mod config;
pub mod jobs;
pub mod media;
pub mod output;
pub mod scraper;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for ScrapeMaster operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Browser rendering failed for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Storage quota exceeded for media type {media_type}")]
    QuotaExceeded { media_type: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(i64),
}

impl ScrapeError {
    /// Summary message safe to surface to users (no raw error internals)
    pub fn summary(&self) -> String {
        match self {
            Self::Fetch { url, .. } => format!("failed to fetch {url}"),
            Self::Timeout { url } => format!("timed out fetching {url}"),
            Self::Browser { url, .. } => format!("browser rendering failed for {url}"),
            Self::Download { url, .. } => format!("failed to download {url}"),
            Self::QuotaExceeded { media_type } => {
                format!("storage quota exhausted for {media_type}")
            }
            Self::Validation(msg) => format!("invalid input: {msg}"),
            Self::JobNotFound(id) => format!("job {id} not found"),
            _ => "internal error".to_string(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Relative URL without a base: {0}")]
    RelativeWithoutBase(String),
}

/// Result type alias for ScrapeMaster operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use jobs::{Job, JobOutcome, ScheduleType, Scheduler};
pub use crate::scraper::DataType;
pub use crate::url::normalize_url;
