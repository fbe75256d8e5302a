//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! full run cycle end-to-end: fetch, extract, clean, persist.

use scrapemaster::config::{Config, ScraperConfig};
use scrapemaster::jobs::{JobOutcome, Scheduler, SystemClock};
use scrapemaster::scraper::{DataType, Fetcher};
use scrapemaster::storage::{SqliteStorage, Storage};
use scrapemaster::ScrapeError;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a config with one job pointed at the mock server
fn test_config(dir: &std::path::Path, job_toml: &str) -> Config {
    let toml = format!(
        r#"
[scraper]
user-agent = "TestAgent/1.0"
fetch-timeout-secs = 5
browser-timeout-secs = 5
fallback-threshold = 1
max-concurrent-jobs = 2
tick-interval-secs = 1

[storage]
database-path = "{db}"
media-root = "{media}"

{job_toml}
"#,
        db = dir.join("test.db").display(),
        media = dir.join("media").display(),
    );
    toml::from_str(&toml).expect("test config should parse")
}

fn build_scheduler(config: &Config) -> (Scheduler, Arc<Mutex<SqliteStorage>>) {
    let storage = Arc::new(Mutex::new(
        SqliteStorage::new(std::path::Path::new(&config.storage.database_path))
            .expect("failed to open test database"),
    ));
    let scheduler = Scheduler::new(config, Arc::clone(&storage), Arc::new(SystemClock))
        .expect("failed to build scheduler");
    (scheduler, storage)
}

#[tokio::test]
async fn test_full_text_scrape_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <h1>Daily Articles</h1>
                    <p>First article body text</p>
                    <p>Second article body text</p>
                    <p>ok</p>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        dir.path(),
        &format!(
            r#"
[[job]]
name = "articles"
url = "{}/articles"
data-type = "Text"
"#,
            mock_server.uri()
        ),
    );

    let (scheduler, storage) = build_scheduler(&config);
    let ids = scheduler.sync_jobs(&config).unwrap();
    let outcome = scheduler.trigger(ids[0]).await.unwrap().unwrap();

    // The two-character paragraph is dropped by the length filter
    assert_eq!(
        outcome,
        JobOutcome::Succeeded {
            items_scraped: 4,
            items_cleaned: 3,
        }
    );

    let storage = storage.lock().unwrap();
    let results = storage.list_results(Some(ids[0])).unwrap();
    let values: Vec<_> = results.iter().map(|r| r.cleaned_value.as_str()).collect();
    assert_eq!(
        values,
        vec![
            "Daily Articles",
            "First article body text",
            "Second article body text",
        ]
    );

    let stats = storage.recent_stats(10).unwrap();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].success);
    assert_eq!(stats[0].items_scraped, 4);
    assert_eq!(stats[0].items_cleaned, 3);

    // The run advanced the job's schedule state
    let job = storage.get_job(ids[0]).unwrap();
    assert!(job.last_run.is_some());
}

#[tokio::test]
async fn test_keyword_filter_limits_stored_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<body>
                    <p>ai technology breakthrough</p>
                    <p>sports roundup</p>
                    <p>Technology news digest</p>
                    </body>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        dir.path(),
        &format!(
            r#"
[[job]]
name = "tech-news"
url = "{}/news"
data-type = "Text"
keyword = "technology"
"#,
            mock_server.uri()
        ),
    );

    let (scheduler, storage) = build_scheduler(&config);
    let ids = scheduler.sync_jobs(&config).unwrap();
    let outcome = scheduler.trigger(ids[0]).await.unwrap().unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Succeeded {
            items_scraped: 2,
            items_cleaned: 2,
        }
    );

    let storage = storage.lock().unwrap();
    let results = storage.list_results(None).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.cleaned_value.to_lowercase().contains("technology")));
}

#[tokio::test]
async fn test_link_job_normalizes_and_dedups() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/links"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<body>
                    <a href="https://example.com/a/">A</a>
                    <a href="https://example.com/a#section">A again</a>
                    <a href="https://example.com/b">B</a>
                    <a href="javascript:void(0)">skip</a>
                    </body>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        dir.path(),
        &format!(
            r#"
[[job]]
name = "links"
url = "{}/links"
data-type = "Links"
"#,
            mock_server.uri()
        ),
    );

    let (scheduler, storage) = build_scheduler(&config);
    let ids = scheduler.sync_jobs(&config).unwrap();
    let outcome = scheduler.trigger(ids[0]).await.unwrap().unwrap();
    assert!(outcome.is_success());

    let storage = storage.lock().unwrap();
    let results = storage.list_results(None).unwrap();
    let values: Vec<_> = results.iter().map(|r| r.cleaned_value.as_str()).collect();
    // Trailing slash and fragment variants collapse to one URL
    assert_eq!(values, vec!["https://example.com/a", "https://example.com/b"]);
}

fn test_fetcher() -> Fetcher {
    let config: ScraperConfig = toml::from_str(
        r#"
user-agent = "TestAgent/1.0"
fetch-timeout-secs = 5
browser-timeout-secs = 5
fallback-threshold = 1
"#,
    )
    .unwrap();
    Fetcher::new(&config).unwrap()
}

#[tokio::test]
async fn test_thin_static_page_escalates_to_browser() {
    let mock_server = MockServer::start().await;

    // A script-rendered shell: zero text candidates in the static HTML
    Mock::given(method("GET"))
        .and(path("/shell"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body><div id="app"></div><script src="/app.js"></script></body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher();
    let url = Url::parse(&format!("{}/shell", mock_server.uri())).unwrap();

    // The thin static result must never be returned as-is: the fetch
    // either comes back browser-rendered or fails on the browser path
    match fetcher.fetch(&url, DataType::Text).await {
        Ok(content) => assert!(content.via_browser),
        Err(err) => assert!(matches!(err, ScrapeError::Browser { .. })),
    }
}

#[tokio::test]
async fn test_static_page_above_threshold_skips_browser() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Server rendered text</p></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher();
    let url = Url::parse(&format!("{}/plain", mock_server.uri())).unwrap();

    let content = fetcher.fetch(&url, DataType::Text).await.unwrap();
    assert!(!content.via_browser);
    assert!(content.html.contains("Server rendered text"));
}

#[tokio::test]
async fn test_trigger_unknown_job_is_an_error() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        dir.path(),
        &format!(
            r#"
[[job]]
name = "only"
url = "{}/x"
data-type = "Text"
"#,
            mock_server.uri()
        ),
    );

    let (scheduler, _storage) = build_scheduler(&config);
    scheduler.sync_jobs(&config).unwrap();

    assert!(scheduler.trigger(9999).await.is_err());
}

#[tokio::test]
async fn test_job_redefinition_keeps_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>Some page content here</p>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let job = format!(
        r#"
[[job]]
name = "page"
url = "{}/page"
data-type = "Text"
"#,
        mock_server.uri()
    );
    let config = test_config(dir.path(), &job);

    let (scheduler, storage) = build_scheduler(&config);
    let ids = scheduler.sync_jobs(&config).unwrap();
    scheduler.trigger(ids[0]).await.unwrap().unwrap();

    // Re-sync, as a daemon restart would
    let ids_again = scheduler.sync_jobs(&config).unwrap();
    assert_eq!(ids, ids_again);

    let storage = storage.lock().unwrap();
    assert_eq!(storage.recent_stats(10).unwrap().len(), 1);
    let job = storage.get_job(ids[0]).unwrap();
    assert!(job.last_run.is_some());
}
