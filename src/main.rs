//! ScrapeMaster main entry point
//!
//! This is the command-line interface for the ScrapeMaster scraping
//! scheduler.

use clap::Parser;
use scrapemaster::config::load_config_with_hash;
use scrapemaster::jobs::{Scheduler, SystemClock};
use scrapemaster::storage::{open_storage, Storage};
use scrapemaster::JobOutcome;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// ScrapeMaster: a scheduled web scraper
///
/// ScrapeMaster runs configured scraping jobs on their schedules,
/// extracting typed data from web pages with a browser fallback for
/// script-rendered sites, cleaning it, and persisting results and media
/// under storage quotas.
#[derive(Parser, Debug)]
#[command(name = "scrapemaster")]
#[command(version = "1.0.0")]
#[command(about = "A scheduled web scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single job by ID and exit
    #[arg(long, value_name = "JOB_ID", conflicts_with_all = ["dry_run", "stats", "export_csv"])]
    run_job: Option<i64>,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with_all = ["stats", "export_csv"])]
    dry_run: bool,

    /// Show dashboard statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_csv"])]
    stats: bool,

    /// Export stored results to CSV and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_csv: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_csv {
        handle_export_csv(&config)?;
    } else if let Some(job_id) = cli.run_job {
        handle_run_job(config, job_id).await?;
    } else {
        handle_daemon(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scrapemaster=info,warn"),
            1 => EnvFilter::new("scrapemaster=debug,info"),
            2 => EnvFilter::new("scrapemaster=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the job plan
fn handle_dry_run(config: &scrapemaster::Config) {
    println!("=== ScrapeMaster Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  User agent: {}", config.scraper.user_agent);
    println!("  Fetch timeout: {}s", config.scraper.fetch_timeout_secs);
    println!(
        "  Browser timeout: {}s",
        config.scraper.browser_timeout_secs
    );
    println!(
        "  Fallback threshold: {} candidates",
        config.scraper.fallback_threshold
    );
    println!("  Workers: {}", config.scraper.max_concurrent_jobs);
    println!("  Tick interval: {}s", config.scraper.tick_interval_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Media root: {}", config.storage.media_root);
    println!(
        "  Image quota: {:.0} MB",
        config.storage.image_quota_bytes as f64 / (1024.0 * 1024.0)
    );
    println!(
        "  Video quota: {:.0} MB",
        config.storage.video_quota_bytes as f64 / (1024.0 * 1024.0)
    );

    println!("\nJobs ({}):", config.jobs.len());
    for job in &config.jobs {
        println!(
            "  - {} [{}] {} ({} {})",
            job.name, job.data_type, job.url, job.schedule_type, job.schedule_value
        );
        if let Some(keyword) = &job.keyword {
            println!("    keyword: {:?}", keyword);
        }
        if job.download_images || job.download_videos {
            println!(
                "    downloads: images={} videos={}",
                job.download_images, job.download_videos
            );
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would schedule {} jobs", config.jobs.len());
}

/// Handles the --stats mode: shows the dashboard from the database
fn handle_stats(config: &scrapemaster::Config) -> Result<(), Box<dyn std::error::Error>> {
    use scrapemaster::output::print_dashboard;

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = storage.dashboard_stats()?;
    print_dashboard(&stats);

    Ok(())
}

/// Handles the --export-csv mode
fn handle_export_csv(config: &scrapemaster::Config) -> Result<(), Box<dyn std::error::Error>> {
    use scrapemaster::output::export_csv;

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let output_path = PathBuf::from(&config.storage.csv_export_path);
    let rows = export_csv(&storage, None, &output_path)?;

    println!("✓ Exported {} results to: {}", rows, output_path.display());
    Ok(())
}

/// Handles the --run-job mode: one run of one job, then exit
async fn handle_run_job(
    config: scrapemaster::Config,
    job_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = build_scheduler(&config)?;
    scheduler.sync_jobs(&config)?;

    match scheduler.trigger(job_id).await? {
        Some(JobOutcome::Succeeded {
            items_scraped,
            items_cleaned,
        }) => {
            println!(
                "✓ Job {} succeeded: {} scraped, {} cleaned",
                job_id, items_scraped, items_cleaned
            );
            Ok(())
        }
        Some(JobOutcome::Failed { message }) => {
            eprintln!("✗ Job {} failed: {}", job_id, message);
            std::process::exit(1);
        }
        None => {
            println!("Job {} is already running, nothing to do", job_id);
            Ok(())
        }
    }
}

/// Handles the default mode: the scheduling daemon
async fn handle_daemon(config: scrapemaster::Config) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = build_scheduler(&config)?;
    let job_ids = scheduler.sync_jobs(&config)?;
    tracing::info!("Scheduling {} jobs", job_ids.len());

    scheduler.run().await?;
    Ok(())
}

fn build_scheduler(config: &scrapemaster::Config) -> Result<Scheduler, Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let storage = Arc::new(Mutex::new(storage));
    let scheduler = Scheduler::new(config, storage, Arc::new(SystemClock))?;
    Ok(scheduler)
}
