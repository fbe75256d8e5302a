//! Storage module for persisting jobs and scraped data
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and schema management
//! - Job definitions and their schedule state
//! - Cleaned result persistence
//! - Per-run execution statistics
//! - The media asset index used for dedup and quota accounting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::ScrapeError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScrapeError> {
    SqliteStorage::new(path)
}

/// A job definition as persisted in the database
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub data_type: String,
    pub keyword: Option<String>,
    pub download_images: bool,
    pub download_videos: bool,
    pub schedule_type: String,
    pub schedule_value: String,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

/// A job definition before insertion
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub url: String,
    pub data_type: String,
    pub keyword: Option<String>,
    pub download_images: bool,
    pub download_videos: bool,
    pub schedule_type: String,
    pub schedule_value: String,
}

/// A cleaned result row
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub id: i64,
    pub job_id: i64,
    pub source_url: String,
    pub data_type: String,
    pub raw_value: String,
    pub cleaned_value: String,
    /// JSON blob with run-level context (keyword, fetch path, error tally)
    pub metadata: Option<String>,
    pub created_at: String,
}

/// A cleaned result before insertion
#[derive(Debug, Clone)]
pub struct NewResult {
    pub source_url: String,
    pub data_type: String,
    pub raw_value: String,
    pub cleaned_value: String,
    pub metadata: Option<String>,
}

/// One execution statistic, recorded exactly once per triggered run
#[derive(Debug, Clone)]
pub struct StatRecord {
    pub id: i64,
    pub job_id: i64,
    pub url: String,
    pub data_type: String,
    pub items_scraped: u64,
    pub items_cleaned: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub execution_time_secs: f64,
    pub created_at: String,
}

/// An execution statistic before insertion
#[derive(Debug, Clone)]
pub struct NewStat {
    pub url: String,
    pub data_type: String,
    pub items_scraped: u64,
    pub items_cleaned: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub execution_time_secs: f64,
}

/// A downloaded media file in the asset index
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub id: i64,
    /// Hex SHA-256 of the file contents; the dedup key
    pub content_hash: String,
    pub media_type: String,
    pub stored_path: String,
    pub byte_size: u64,
    pub source_url: String,
    pub created_at: String,
}

/// A media asset before insertion
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub content_hash: String,
    pub media_type: String,
    pub stored_path: String,
    pub byte_size: u64,
    pub source_url: String,
}

/// Aggregate statistics for the dashboard view
#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_jobs: u64,
    pub active_jobs: u64,
    pub total_results: u64,
    pub total_runs: u64,
    /// Fraction of successful runs over the most recent 100 runs
    pub success_rate: f64,
    pub avg_execution_time_secs: f64,
    /// (data type, result count), ordered by count descending
    pub results_by_type: Vec<(String, u64)>,
    /// (media type, total bytes, file count)
    pub media_usage: Vec<(String, u64, u64)>,
}
