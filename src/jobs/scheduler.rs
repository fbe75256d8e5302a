//! Job scheduling loop
//!
//! The scheduler owns the worker pool and the running set. On every tick
//! it loads the active jobs, computes which are due, and spawns a run per
//! due job. Two rules hold at all times:
//! - At most one run per job: a job already in the running set is
//!   skipped, whether it became due again or was triggered manually
//! - At most `max_concurrent_jobs` runs in flight, enforced by a
//!   semaphore so each run holds one browser session at most

use crate::config::Config;
use crate::jobs::executor::{Executor, Job, JobOutcome};
use crate::jobs::schedule::{Clock, ScheduleType};
use crate::storage::{JobRecord, NewJob, SqliteStorage, Storage};
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Drives recurring jobs and manual triggers
pub struct Scheduler {
    executor: Arc<Executor>,
    storage: Arc<Mutex<SqliteStorage>>,
    clock: Arc<dyn Clock>,
    running: Arc<Mutex<HashSet<i64>>>,
    workers: Arc<Semaphore>,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        storage: Arc<Mutex<SqliteStorage>>,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let executor = Arc::new(Executor::new(config, Arc::clone(&storage), Arc::clone(&clock))?);

        Ok(Self {
            executor,
            storage,
            clock,
            running: Arc::new(Mutex::new(HashSet::new())),
            workers: Arc::new(Semaphore::new(config.scraper.max_concurrent_jobs as usize)),
            tick_interval: Duration::from_secs(config.scraper.tick_interval_secs),
        })
    }

    /// Syncs configured jobs into the database
    ///
    /// Jobs are keyed by name; redefined jobs keep their run history and
    /// schedule state. Returns the IDs in configuration order.
    pub fn sync_jobs(&self, config: &Config) -> crate::Result<Vec<i64>> {
        let mut storage = lock(&self.storage);
        let mut ids = Vec::with_capacity(config.jobs.len());

        for entry in &config.jobs {
            let id = storage.upsert_job(&NewJob {
                name: entry.name.clone(),
                url: entry.url.clone(),
                data_type: entry.data_type.clone(),
                keyword: entry.keyword.clone(),
                download_images: entry.download_images,
                download_videos: entry.download_videos,
                schedule_type: entry.schedule_type.clone(),
                schedule_value: entry.schedule_value.clone(),
            })?;
            ids.push(id);
        }

        tracing::info!("Synced {} configured jobs", ids.len());
        Ok(ids)
    }

    /// Runs the scheduling loop until the task is cancelled
    pub async fn run(&self) -> crate::Result<()> {
        tracing::info!(
            "Scheduler started (tick every {:?}, {} workers)",
            self.tick_interval,
            self.workers.available_permits()
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.tick() {
                tracing::error!("Scheduler tick failed: {}", e);
            }
        }
    }

    /// One pass over the active jobs, spawning runs for those due
    pub fn tick(&self) -> crate::Result<()> {
        let now = self.clock.now();
        let records = {
            let storage = lock(&self.storage);
            storage.list_active_jobs()?
        };

        for record in records {
            if !is_due(&record, now) {
                continue;
            }

            let job = match Job::from_record(&record) {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!("Skipping unrunnable job {:?}: {}", record.name, e);
                    continue;
                }
            };

            self.spawn_run(job);
        }

        Ok(())
    }

    /// Manually triggers one job and waits for its outcome
    ///
    /// Returns None without recording anything when the job is already
    /// running.
    pub async fn trigger(&self, job_id: i64) -> crate::Result<Option<JobOutcome>> {
        let record = {
            let storage = lock(&self.storage);
            storage.get_job(job_id)?
        };
        let job = Job::from_record(&record)?;

        let Some(_guard) = RunningGuard::acquire(&self.running, job.id) else {
            tracing::info!("Job {:?} is already running, trigger ignored", job.name);
            return Ok(None);
        };

        let _permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Validation("worker pool is closed".to_string()))?;

        Ok(Some(self.executor.run_job(&job).await))
    }

    /// Spawns a run on the worker pool; a no-op if the job is running
    fn spawn_run(&self, job: Job) -> bool {
        let Some(guard) = RunningGuard::acquire(&self.running, job.id) else {
            tracing::debug!("Job {:?} still running, skipping this trigger", job.name);
            return false;
        };

        let executor = Arc::clone(&self.executor);
        let workers = Arc::clone(&self.workers);

        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            executor.run_job(&job).await;
        });

        true
    }
}

/// Marks a job as running for its lifetime
struct RunningGuard {
    running: Arc<Mutex<HashSet<i64>>>,
    job_id: i64,
}

impl RunningGuard {
    /// Claims the job, or returns None if another run holds it
    fn acquire(running: &Arc<Mutex<HashSet<i64>>>, job_id: i64) -> Option<Self> {
        let mut set = match running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !set.insert(job_id) {
            return None;
        }
        Some(Self {
            running: Arc::clone(running),
            job_id,
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut set = match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.job_id);
    }
}

/// Whether a job record is due at `now`
///
/// A recurring job with no recorded next_run (freshly synced, never run)
/// is due immediately; after its first run the boundary arithmetic takes
/// over. Manual jobs are never due on their own.
fn is_due(record: &JobRecord, now: DateTime<Utc>) -> bool {
    let schedule = match ScheduleType::parse(&record.schedule_type, &record.schedule_value) {
        Ok(schedule) => schedule,
        Err(_) => return false,
    };

    if schedule == ScheduleType::Manual {
        return false;
    }

    match (record.next_run, record.last_run) {
        (Some(next), _) => next <= now,
        (None, Some(last)) => match schedule.next_run_after(last) {
            Some(next) => next <= now,
            None => false,
        },
        (None, None) => true,
    }
}

fn lock(storage: &Arc<Mutex<SqliteStorage>>) -> std::sync::MutexGuard<'_, SqliteStorage> {
    match storage.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
