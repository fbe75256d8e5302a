use serde::Deserialize;

/// Main configuration structure for ScrapeMaster
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobEntry>,
}

/// Scraper and scheduler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// User agent header sent with every static fetch
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a static HTTP fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for a browser-rendered fetch (seconds)
    #[serde(rename = "browser-timeout-secs", default = "default_browser_timeout")]
    pub browser_timeout_secs: u64,

    /// Minimum candidate elements a static parse must yield before the
    /// browser fallback is skipped
    #[serde(rename = "fallback-threshold", default = "default_fallback_threshold")]
    pub fallback_threshold: usize,

    /// Timeout for a single media asset download (seconds)
    #[serde(rename = "download-timeout-secs", default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Maximum number of job runs executing at once (caps browser sessions)
    #[serde(rename = "max-concurrent-jobs", default = "default_max_concurrent")]
    pub max_concurrent_jobs: u32,

    /// Scheduler tick interval (seconds)
    #[serde(rename = "tick-interval-secs", default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Minutes to push back next_run after a failed run.
    /// 0 means a failed run keeps its regular schedule slot.
    #[serde(rename = "failure-backoff-minutes", default)]
    pub failure_backoff_minutes: u64,
}

/// Storage locations and media quotas
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Root directory for downloaded media (one subdirectory per media type)
    #[serde(rename = "media-root")]
    pub media_root: String,

    /// Path for CSV exports of cleaned results
    #[serde(rename = "csv-export-path", default = "default_csv_path")]
    pub csv_export_path: String,

    /// Storage cap for downloaded images (bytes)
    #[serde(rename = "image-quota-bytes", default = "default_quota")]
    pub image_quota_bytes: u64,

    /// Storage cap for downloaded videos (bytes)
    #[serde(rename = "video-quota-bytes", default = "default_quota")]
    pub video_quota_bytes: u64,
}

/// A scrape job declared in the configuration file
///
/// Jobs are registered into storage at startup; scheduling fields
/// (last_run/next_run) live in the database, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    pub name: String,

    /// Target URL to scrape
    pub url: String,

    /// What to extract: Text, Links, Images, or Videos
    #[serde(rename = "data-type")]
    pub data_type: String,

    /// Optional case-insensitive keyword filter over extracted items
    #[serde(default)]
    pub keyword: Option<String>,

    /// Download image assets referenced by cleaned items
    #[serde(rename = "download-images", default)]
    pub download_images: bool,

    /// Download video assets referenced by cleaned items
    #[serde(rename = "download-videos", default)]
    pub download_videos: bool,

    /// Schedule kind: manual, hourly, daily, or weekly
    #[serde(rename = "schedule-type", default = "default_schedule_type")]
    pub schedule_type: String,

    /// Schedule parameter: hours for hourly, HH:MM for daily,
    /// weekday name for weekly; ignored for manual
    #[serde(rename = "schedule-value", default)]
    pub schedule_value: String,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_browser_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    30
}

fn default_fallback_threshold() -> usize {
    1
}

fn default_max_concurrent() -> u32 {
    4
}

fn default_tick_interval() -> u64 {
    30
}

fn default_csv_path() -> String {
    "./data/scraped_data.csv".to_string()
}

// 500MB per media type
fn default_quota() -> u64 {
    500 * 1024 * 1024
}

fn default_schedule_type() -> String {
    "manual".to_string()
}
