//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    DashboardStats, JobRecord, MediaRecord, NewJob, NewMediaAsset, NewResult, NewStat,
    ResultRecord, StatRecord,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Media asset not found: {0}")]
    MediaNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the scraper and
/// scheduler.
pub trait Storage {
    // ===== Job Management =====

    /// Inserts a job, or updates the definition of an existing job with
    /// the same name
    ///
    /// Schedule state (`last_run`, `next_run`, `is_active`) is preserved
    /// across updates so that redefining a job in configuration does not
    /// reset its history.
    ///
    /// # Returns
    ///
    /// The job ID (either newly created or existing)
    fn upsert_job(&mut self, job: &NewJob) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord>;

    /// Gets a job by its unique name
    fn get_job_by_name(&self, name: &str) -> StorageResult<Option<JobRecord>>;

    /// Lists every job
    fn list_jobs(&self) -> StorageResult<Vec<JobRecord>>;

    /// Lists jobs eligible for scheduling
    fn list_active_jobs(&self) -> StorageResult<Vec<JobRecord>>;

    /// Activates or deactivates a job
    fn set_job_active(&mut self, job_id: i64, active: bool) -> StorageResult<()>;

    /// Records the schedule state after a run
    fn update_job_schedule(
        &mut self,
        job_id: i64,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    // ===== Run Persistence =====

    /// Persists the outcome of one run in a single transaction
    ///
    /// All result rows and the single stat row commit together; a failure
    /// rolls everything back so a run is never half-recorded.
    fn save_run(
        &mut self,
        job_id: i64,
        results: &[NewResult],
        stat: &NewStat,
    ) -> StorageResult<i64>;

    /// Lists results for export, oldest first
    ///
    /// A job ID limits the export to that job; None exports everything.
    fn list_results(&self, job_id: Option<i64>) -> StorageResult<Vec<ResultRecord>>;

    /// Counts stored results
    fn count_results(&self) -> StorageResult<u64>;

    /// Deletes results, either for one job or across all jobs
    fn clear_results(&mut self, job_id: Option<i64>) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Gets the most recent execution stats, newest first
    fn recent_stats(&self, limit: u32) -> StorageResult<Vec<StatRecord>>;

    /// Computes the aggregate dashboard view
    fn dashboard_stats(&self) -> StorageResult<DashboardStats>;

    // ===== Media Assets =====

    /// Records a downloaded media file
    fn insert_media_asset(&mut self, asset: &NewMediaAsset) -> StorageResult<i64>;

    /// Looks up an asset by content hash
    fn find_media_by_hash(&self, content_hash: &str) -> StorageResult<Option<MediaRecord>>;

    /// Lists assets of one media type, oldest first (the eviction order)
    fn list_media_oldest_first(&self, media_type: &str) -> StorageResult<Vec<MediaRecord>>;

    /// Removes an asset row after its file has been deleted
    fn delete_media_asset(&mut self, asset_id: i64) -> StorageResult<()>;

    /// Total bytes currently recorded for a media type
    fn media_usage_bytes(&self, media_type: &str) -> StorageResult<u64>;
}
