//! Single job execution
//!
//! One run walks the whole pipeline: fetch (static with browser
//! fallback), extract, keyword filter, clean, optional media downloads,
//! then a single transactional persist of results plus exactly one
//! execution statistic. Schedule state advances after every run, failed
//! or not.

use crate::cleaning::Pipeline;
use crate::config::Config;
use crate::jobs::schedule::{Clock, ScheduleType};
use crate::media::{MediaStore, MediaType};
use crate::scraper::{extract, filter_by_keyword, is_video_embed, DataType, Fetcher};
use crate::storage::{JobRecord, NewResult, NewStat, SqliteStorage, Storage};
use crate::ScrapeError;
use chrono::Duration as ChronoDuration;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// A runnable job, parsed out of its database record
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub url: Url,
    pub data_type: DataType,
    pub keyword: Option<String>,
    pub download_images: bool,
    pub download_videos: bool,
    pub schedule: ScheduleType,
}

impl Job {
    /// Parses a stored job record into a runnable job
    ///
    /// # Errors
    ///
    /// Returns a validation error when the record carries an unparseable
    /// URL, data type, or schedule. Config validation prevents these at
    /// load time, so this guards against hand-edited database rows.
    pub fn from_record(record: &JobRecord) -> crate::Result<Self> {
        let url = crate::url::normalize_url(&record.url, None)?;

        let data_type = DataType::parse(&record.data_type).ok_or_else(|| {
            ScrapeError::Validation(format!(
                "job {:?} has unknown data type {:?}",
                record.name, record.data_type
            ))
        })?;

        let schedule = ScheduleType::parse(&record.schedule_type, &record.schedule_value)
            .map_err(|e| {
                ScrapeError::Validation(format!("job {:?} has invalid schedule: {e}", record.name))
            })?;

        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            url,
            data_type,
            keyword: record.keyword.clone(),
            download_images: record.download_images,
            download_videos: record.download_videos,
            schedule,
        })
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded {
        items_scraped: u64,
        items_cleaned: u64,
    },
    Failed {
        message: String,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Tally of media downloads over one run
#[derive(Debug, Default)]
struct DownloadTally {
    attempted: u64,
    stored: u64,
    deduplicated: u64,
    failed: u64,
}

/// Runs jobs end to end
pub struct Executor {
    fetcher: Fetcher,
    media: MediaStore,
    storage: Arc<Mutex<SqliteStorage>>,
    clock: Arc<dyn Clock>,
    failure_backoff: ChronoDuration,
}

impl Executor {
    pub fn new(
        config: &Config,
        storage: Arc<Mutex<SqliteStorage>>,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let fetcher = Fetcher::new(&config.scraper)?;
        let media = MediaStore::new(
            fetcher.client().clone(),
            &config.storage,
            Duration::from_secs(config.scraper.download_timeout_secs),
            Arc::clone(&storage),
        );

        Ok(Self {
            fetcher,
            media,
            storage,
            clock,
            failure_backoff: ChronoDuration::minutes(config.scraper.failure_backoff_minutes as i64),
        })
    }

    /// Executes one run of a job and records its outcome
    ///
    /// Always records exactly one execution statistic and always advances
    /// the job's schedule state; errors while persisting are logged and
    /// folded into a failed outcome rather than panicking a worker.
    pub async fn run_job(&self, job: &Job) -> JobOutcome {
        tracing::info!("Running job {:?} ({})", job.name, job.url);
        let started = std::time::Instant::now();

        let outcome = match self.scrape(job).await {
            Ok((results, items_scraped, via_browser)) => {
                let items_cleaned = results.len() as u64;
                let stat = NewStat {
                    url: job.url.to_string(),
                    data_type: job.data_type.as_str().to_string(),
                    items_scraped,
                    items_cleaned,
                    success: true,
                    error_message: None,
                    execution_time_secs: started.elapsed().as_secs_f64(),
                };

                if let Err(e) = self.persist(job, results, stat) {
                    tracing::error!("Failed to persist run of {:?}: {}", job.name, e);
                    JobOutcome::Failed {
                        message: e.summary(),
                    }
                } else {
                    tracing::info!(
                        "Job {:?} succeeded: {} scraped, {} cleaned (browser: {})",
                        job.name,
                        items_scraped,
                        items_cleaned,
                        via_browser
                    );
                    JobOutcome::Succeeded {
                        items_scraped,
                        items_cleaned,
                    }
                }
            }
            Err(e) => {
                let message = e.summary();
                tracing::warn!("Job {:?} failed: {}", job.name, message);
                let stat = NewStat {
                    url: job.url.to_string(),
                    data_type: job.data_type.as_str().to_string(),
                    items_scraped: 0,
                    items_cleaned: 0,
                    success: false,
                    error_message: Some(message.clone()),
                    execution_time_secs: started.elapsed().as_secs_f64(),
                };
                if let Err(e) = self.persist(job, Vec::new(), stat) {
                    tracing::error!("Failed to record failure of {:?}: {}", job.name, e);
                }
                JobOutcome::Failed { message }
            }
        };

        self.advance_schedule(job, &outcome);
        outcome
    }

    /// The fetch-extract-clean-download portion of a run
    async fn scrape(&self, job: &Job) -> crate::Result<(Vec<NewResult>, u64, bool)> {
        let content = self.fetcher.fetch(&job.url, job.data_type).await?;

        let mut items = extract(&content.html, &content.url, job.data_type);
        if let Some(keyword) = &job.keyword {
            items = filter_by_keyword(items, keyword);
        }
        let items_scraped = items.len() as u64;

        let pipeline = Pipeline::default_for(job.data_type);
        let output = pipeline.run(items);
        tracing::debug!(
            "Job {:?}: cleaning kept {} of {} items",
            job.name,
            output.cleaned_count,
            output.raw_count
        );

        let tally = self.download_media(job, &output.items).await;

        let results = output
            .items
            .into_iter()
            .map(|item| {
                let metadata = serde_json::json!({
                    "position": item.position,
                    "via_browser": content.via_browser,
                    "keyword": job.keyword,
                    "downloads_failed": tally.failed,
                });
                NewResult {
                    source_url: item.source_url,
                    data_type: item.data_type.as_str().to_string(),
                    raw_value: item.raw_value,
                    cleaned_value: item.cleaned_value,
                    metadata: Some(metadata.to_string()),
                }
            })
            .collect();

        Ok((results, items_scraped, content.via_browser))
    }

    /// Downloads media for URL-typed results where the job asks for it
    ///
    /// Individual download failures are tallied, not fatal; a quota
    /// overflow stops further downloads of that type for this run.
    async fn download_media(
        &self,
        job: &Job,
        items: &[crate::cleaning::CleanedItem],
    ) -> DownloadTally {
        let media_type = match job.data_type {
            DataType::Images if job.download_images => MediaType::Images,
            DataType::Videos if job.download_videos => MediaType::Videos,
            _ => return DownloadTally::default(),
        };

        let mut tally = DownloadTally::default();
        for item in items {
            // Embed pages are references to players, not video files
            if media_type == MediaType::Videos && is_video_embed(&item.cleaned_value) {
                continue;
            }

            let url = match Url::parse(&item.cleaned_value) {
                Ok(url) => url,
                Err(_) => continue,
            };

            tally.attempted += 1;
            match self.media.download(&url, media_type).await {
                Ok(outcome) if outcome.deduplicated => tally.deduplicated += 1,
                Ok(_) => tally.stored += 1,
                Err(ScrapeError::QuotaExceeded { media_type }) => {
                    tracing::warn!(
                        "Job {:?}: {} quota exhausted, skipping remaining downloads",
                        job.name,
                        media_type
                    );
                    tally.failed += 1;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Job {:?}: download of {} failed: {}", job.name, url, e);
                    tally.failed += 1;
                }
            }
        }

        tracing::debug!(
            "Job {:?}: {} downloads attempted, {} stored, {} deduplicated, {} failed",
            job.name,
            tally.attempted,
            tally.stored,
            tally.deduplicated,
            tally.failed
        );
        tally
    }

    /// Commits results and the run statistic in one transaction
    fn persist(&self, job: &Job, results: Vec<NewResult>, stat: NewStat) -> crate::Result<()> {
        let mut storage = lock_storage(&self.storage);
        storage.save_run(job.id, &results, &stat)?;
        Ok(())
    }

    /// Advances last_run/next_run after a run, applying failure backoff
    fn advance_schedule(&self, job: &Job, outcome: &JobOutcome) {
        let now = self.clock.now();
        let mut next_run = job.schedule.next_run_after(now);

        // A failed run of a recurring job retries after the configured
        // backoff instead of waiting out the full recurrence
        if !outcome.is_success() && self.failure_backoff > ChronoDuration::zero() {
            if next_run.is_some() {
                next_run = Some(now + self.failure_backoff);
            }
        }

        let mut storage = lock_storage(&self.storage);
        if let Err(e) = storage.update_job_schedule(job.id, now, next_run) {
            tracing::error!("Failed to update schedule for job {:?}: {}", job.name, e);
        }
    }
}

fn lock_storage(storage: &Arc<Mutex<SqliteStorage>>) -> std::sync::MutexGuard<'_, SqliteStorage> {
    match storage.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
