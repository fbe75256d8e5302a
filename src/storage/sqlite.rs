//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    DashboardStats, JobRecord, MediaRecord, NewJob, NewMediaAsset, NewResult, NewStat,
    ResultRecord, StatRecord,
};
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, ScrapeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const JOB_COLUMNS: &str = "id, name, url, data_type, keyword, download_images, download_videos,
     schedule_type, schedule_value, is_active, last_run, next_run, created_at, updated_at";

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        data_type: row.get(3)?,
        keyword: row.get(4)?,
        download_images: row.get(5)?,
        download_videos: row.get(6)?,
        schedule_type: row.get(7)?,
        schedule_value: row.get(8)?,
        is_active: row.get(9)?,
        last_run: parse_optional_ts(row.get(10)?, 10)?,
        next_run: parse_optional_ts(row.get(11)?, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Parses an RFC 3339 timestamp column, treating garbage as a conversion
/// failure rather than silently dropping it
fn parse_optional_ts(
    value: Option<String>,
    column: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    column,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
    }
}

fn map_result_row(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    Ok(ResultRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        source_url: row.get(2)?,
        data_type: row.get(3)?,
        raw_value: row.get(4)?,
        cleaned_value: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_stat_row(row: &Row<'_>) -> rusqlite::Result<StatRecord> {
    Ok(StatRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        url: row.get(2)?,
        data_type: row.get(3)?,
        items_scraped: row.get(4)?,
        items_cleaned: row.get(5)?,
        success: row.get(6)?,
        error_message: row.get(7)?,
        execution_time_secs: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_media_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        id: row.get(0)?,
        content_hash: row.get(1)?,
        media_type: row.get(2)?,
        stored_path: row.get(3)?,
        byte_size: row.get(4)?,
        source_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Job Management =====

    fn upsert_job(&mut self, job: &NewJob) -> StorageResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM scraping_jobs WHERE name = ?1",
                params![job.name],
                |row| row.get(0),
            )
            .optional()?;

        let now = Utc::now().to_rfc3339();

        if let Some(id) = existing {
            // Redefinition keeps schedule state and history
            self.conn.execute(
                "UPDATE scraping_jobs SET url = ?1, data_type = ?2, keyword = ?3,
                 download_images = ?4, download_videos = ?5, schedule_type = ?6,
                 schedule_value = ?7, updated_at = ?8 WHERE id = ?9",
                params![
                    job.url,
                    job.data_type,
                    job.keyword,
                    job.download_images,
                    job.download_videos,
                    job.schedule_type,
                    job.schedule_value,
                    now,
                    id
                ],
            )?;
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO scraping_jobs (name, url, data_type, keyword, download_images,
             download_videos, schedule_type, schedule_value, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
            params![
                job.name,
                job.url,
                job.data_type,
                job.keyword,
                job.download_images,
                job.download_videos,
                job.schedule_type,
                job.schedule_value,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM scraping_jobs WHERE id = ?1"
        ))?;

        stmt.query_row(params![job_id], map_job_row)
            .optional()?
            .ok_or(StorageError::JobNotFound(job_id))
    }

    fn get_job_by_name(&self, name: &str) -> StorageResult<Option<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM scraping_jobs WHERE name = ?1"
        ))?;

        Ok(stmt.query_row(params![name], map_job_row).optional()?)
    }

    fn list_jobs(&self) -> StorageResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM scraping_jobs ORDER BY id"
        ))?;

        let jobs = stmt
            .query_map([], map_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn list_active_jobs(&self) -> StorageResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM scraping_jobs WHERE is_active = 1 ORDER BY id"
        ))?;

        let jobs = stmt
            .query_map([], map_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn set_job_active(&mut self, job_id: i64, active: bool) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE scraping_jobs SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now().to_rfc3339(), job_id],
        )?;
        if changed == 0 {
            return Err(StorageError::JobNotFound(job_id));
        }
        Ok(())
    }

    fn update_job_schedule(
        &mut self,
        job_id: i64,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE scraping_jobs SET last_run = ?1, next_run = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                last_run.to_rfc3339(),
                next_run.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339(),
                job_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::JobNotFound(job_id));
        }
        Ok(())
    }

    // ===== Run Persistence =====

    fn save_run(
        &mut self,
        job_id: i64,
        results: &[NewResult],
        stat: &NewStat,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO scraping_results (job_id, source_url, data_type, raw_value,
                 cleaned_value, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for result in results {
                insert.execute(params![
                    job_id,
                    result.source_url,
                    result.data_type,
                    result.raw_value,
                    result.cleaned_value,
                    result.metadata,
                    now
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO scraping_stats (job_id, url, data_type, items_scraped, items_cleaned,
             success, error_message, execution_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                job_id,
                stat.url,
                stat.data_type,
                stat.items_scraped,
                stat.items_cleaned,
                stat.success,
                stat.error_message,
                stat.execution_time_secs,
                now
            ],
        )?;

        let stat_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(stat_id)
    }

    fn list_results(&self, job_id: Option<i64>) -> StorageResult<Vec<ResultRecord>> {
        const COLUMNS: &str =
            "id, job_id, source_url, data_type, raw_value, cleaned_value, metadata, created_at";

        let results = match job_id {
            Some(id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM scraping_results WHERE job_id = ?1 ORDER BY id"
                ))?;
                let rows = stmt
                    .query_map(params![id], map_result_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {COLUMNS} FROM scraping_results ORDER BY id"))?;
                let rows = stmt
                    .query_map([], map_result_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(results)
    }

    fn count_results(&self) -> StorageResult<u64> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM scraping_results", [], |row| row.get(0))?;
        Ok(count)
    }

    fn clear_results(&mut self, job_id: Option<i64>) -> StorageResult<u64> {
        let deleted = match job_id {
            Some(id) => self
                .conn
                .execute("DELETE FROM scraping_results WHERE job_id = ?1", params![id])?,
            None => self.conn.execute("DELETE FROM scraping_results", [])?,
        };
        Ok(deleted as u64)
    }

    // ===== Statistics =====

    fn recent_stats(&self, limit: u32) -> StorageResult<Vec<StatRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_id, url, data_type, items_scraped, items_cleaned, success,
             error_message, execution_time, created_at
             FROM scraping_stats ORDER BY id DESC LIMIT ?1",
        )?;

        let stats = stmt
            .query_map(params![limit], map_stat_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    fn dashboard_stats(&self) -> StorageResult<DashboardStats> {
        let total_jobs: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM scraping_jobs", [], |row| row.get(0))?;

        let active_jobs: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scraping_jobs WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;

        let total_results = self.count_results()?;

        let total_runs: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM scraping_stats", [], |row| row.get(0))?;

        // Success rate over the most recent 100 runs
        let (recent, recent_ok): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(success), 0)
             FROM (SELECT success FROM scraping_stats ORDER BY id DESC LIMIT 100)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let success_rate = if recent > 0 {
            recent_ok as f64 / recent as f64
        } else {
            0.0
        };

        let avg_execution_time_secs: f64 = self.conn.query_row(
            "SELECT COALESCE(AVG(execution_time), 0) FROM scraping_stats",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT data_type, COUNT(*) FROM scraping_results
             GROUP BY data_type ORDER BY COUNT(*) DESC",
        )?;
        let results_by_type = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, u64)>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT media_type, COALESCE(SUM(byte_size), 0), COUNT(*)
             FROM media_assets GROUP BY media_type ORDER BY media_type",
        )?;
        let media_usage = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<(String, u64, u64)>, _>>()?;

        Ok(DashboardStats {
            total_jobs,
            active_jobs,
            total_results,
            total_runs,
            success_rate,
            avg_execution_time_secs,
            results_by_type,
            media_usage,
        })
    }

    // ===== Media Assets =====

    fn insert_media_asset(&mut self, asset: &NewMediaAsset) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO media_assets (content_hash, media_type, stored_path, byte_size,
             source_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                asset.content_hash,
                asset.media_type,
                asset.stored_path,
                asset.byte_size,
                asset.source_url,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_media_by_hash(&self, content_hash: &str) -> StorageResult<Option<MediaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_hash, media_type, stored_path, byte_size, source_url, created_at
             FROM media_assets WHERE content_hash = ?1",
        )?;

        Ok(stmt
            .query_row(params![content_hash], map_media_row)
            .optional()?)
    }

    fn list_media_oldest_first(&self, media_type: &str) -> StorageResult<Vec<MediaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_hash, media_type, stored_path, byte_size, source_url, created_at
             FROM media_assets WHERE media_type = ?1 ORDER BY id",
        )?;

        let assets = stmt
            .query_map(params![media_type], map_media_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    fn delete_media_asset(&mut self, asset_id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM media_assets WHERE id = ?1", params![asset_id])?;
        if changed == 0 {
            return Err(StorageError::MediaNotFound(asset_id));
        }
        Ok(())
    }

    fn media_usage_bytes(&self, media_type: &str) -> StorageResult<u64> {
        let bytes: u64 = self.conn.query_row(
            "SELECT COALESCE(SUM(byte_size), 0) FROM media_assets WHERE media_type = ?1",
            params![media_type],
            |row| row.get(0),
        )?;
        Ok(bytes)
    }
}
