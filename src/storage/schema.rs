//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the ScrapeMaster
//! database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Job definitions and their schedule state
CREATE TABLE IF NOT EXISTS scraping_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    data_type TEXT NOT NULL,
    keyword TEXT,
    download_images INTEGER NOT NULL DEFAULT 0,
    download_videos INTEGER NOT NULL DEFAULT 0,
    schedule_type TEXT NOT NULL,
    schedule_value TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_run TEXT,
    next_run TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_active ON scraping_jobs(is_active);

-- Cleaned results, one row per surviving item
CREATE TABLE IF NOT EXISTS scraping_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES scraping_jobs(id),
    source_url TEXT NOT NULL,
    data_type TEXT NOT NULL,
    raw_value TEXT NOT NULL,
    cleaned_value TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_job ON scraping_results(job_id);
CREATE INDEX IF NOT EXISTS idx_results_type ON scraping_results(data_type);

-- Execution statistics, exactly one row per triggered run
CREATE TABLE IF NOT EXISTS scraping_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES scraping_jobs(id),
    url TEXT NOT NULL,
    data_type TEXT NOT NULL,
    items_scraped INTEGER NOT NULL DEFAULT 0,
    items_cleaned INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL,
    error_message TEXT,
    execution_time REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stats_job ON scraping_stats(job_id);
CREATE INDEX IF NOT EXISTS idx_stats_created ON scraping_stats(created_at);

-- Downloaded media files, keyed by content hash for dedup
CREATE TABLE IF NOT EXISTS media_assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_hash TEXT NOT NULL UNIQUE,
    media_type TEXT NOT NULL,
    stored_path TEXT NOT NULL,
    byte_size INTEGER NOT NULL,
    source_url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_type ON media_assets(media_type);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
