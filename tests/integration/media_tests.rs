//! Integration tests for media downloads, dedup, and quota eviction

use scrapemaster::config::StorageConfig;
use scrapemaster::media::{MediaStore, MediaType};
use scrapemaster::storage::{SqliteStorage, Storage};
use scrapemaster::ScrapeError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn media_store(
    dir: &std::path::Path,
    image_quota: u64,
) -> (MediaStore, Arc<Mutex<SqliteStorage>>) {
    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let config = StorageConfig {
        database_path: dir.join("test.db").display().to_string(),
        media_root: dir.join("media").display().to_string(),
        csv_export_path: dir.join("export.csv").display().to_string(),
        image_quota_bytes: image_quota,
        video_quota_bytes: image_quota,
    };
    let store = MediaStore::new(
        reqwest::Client::new(),
        &config,
        Duration::from_secs(5),
        Arc::clone(&storage),
    );
    (store, storage)
}

async fn mount_image(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "image/png"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_identical_bytes_from_two_urls_store_once() {
    let server = MockServer::start().await;
    let body = vec![7u8; 1000];
    mount_image(&server, "/one.png", body.clone()).await;
    mount_image(&server, "/two.png", body).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, storage) = media_store(dir.path(), 10_000);

    let first = store
        .download(
            &Url::parse(&format!("{}/one.png", server.uri())).unwrap(),
            MediaType::Images,
        )
        .await
        .unwrap();
    assert!(!first.deduplicated);
    assert_eq!(first.byte_size, 1000);
    assert!(first.stored_path.exists());

    let second = store
        .download(
            &Url::parse(&format!("{}/two.png", server.uri())).unwrap(),
            MediaType::Images,
        )
        .await
        .unwrap();
    assert!(second.deduplicated);
    assert_eq!(second.stored_path, first.stored_path);

    let storage = storage.lock().unwrap();
    assert_eq!(storage.list_media_oldest_first("images").unwrap().len(), 1);
    assert_eq!(storage.media_usage_bytes("images").unwrap(), 1000);
}

#[tokio::test]
async fn test_quota_eviction_drops_oldest_assets() {
    let server = MockServer::start().await;
    // Distinct bodies so nothing dedups
    mount_image(&server, "/a.png", vec![1u8; 1000]).await;
    mount_image(&server, "/b.png", vec![2u8; 1000]).await;
    mount_image(&server, "/c.png", vec![3u8; 1000]).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, storage) = media_store(dir.path(), 2500);

    let mut paths = Vec::new();
    for route in ["/a.png", "/b.png", "/c.png"] {
        let outcome = store
            .download(
                &Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
                MediaType::Images,
            )
            .await
            .unwrap();
        paths.push(outcome.stored_path);
    }

    let storage = storage.lock().unwrap();
    let used = storage.media_usage_bytes("images").unwrap();
    assert!(used <= 2500, "usage {} exceeds quota", used);

    // Oldest asset made room for the newest
    let remaining = storage.list_media_oldest_first("images").unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(!paths[0].exists());
    assert!(paths[1].exists());
    assert!(paths[2].exists());
}

#[tokio::test]
async fn test_concurrent_downloads_stay_under_quota() {
    let server = MockServer::start().await;
    mount_image(&server, "/left.png", vec![4u8; 600]).await;
    mount_image(&server, "/right.png", vec![5u8; 600]).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, storage) = media_store(dir.path(), 1000);
    let store = Arc::new(store);

    // Either file fits alone but the pair does not; whichever commit
    // lands second must see the first and evict it
    let mut handles = Vec::new();
    for route in ["/left.png", "/right.png"] {
        let store = Arc::clone(&store);
        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        handles.push(tokio::spawn(async move {
            store.download(&url, MediaType::Images).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let storage = storage.lock().unwrap();
    assert_eq!(storage.media_usage_bytes("images").unwrap(), 600);
    assert_eq!(storage.list_media_oldest_first("images").unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_larger_than_quota_is_rejected() {
    let server = MockServer::start().await;
    mount_image(&server, "/big.png", vec![9u8; 5000]).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, storage) = media_store(dir.path(), 2500);

    let result = store
        .download(
            &Url::parse(&format!("{}/big.png", server.uri())).unwrap(),
            MediaType::Images,
        )
        .await;

    assert!(matches!(result, Err(ScrapeError::QuotaExceeded { .. })));
    let storage = storage.lock().unwrap();
    assert_eq!(storage.media_usage_bytes("images").unwrap(), 0);
}

#[tokio::test]
async fn test_content_type_mismatch_is_a_download_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>not an image</html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, storage) = media_store(dir.path(), 10_000);

    let result = store
        .download(
            &Url::parse(&format!("{}/broken.png", server.uri())).unwrap(),
            MediaType::Images,
        )
        .await;

    assert!(matches!(result, Err(ScrapeError::Download { .. })));
    let storage = storage.lock().unwrap();
    assert!(storage.list_media_oldest_first("images").unwrap().is_empty());
}

#[tokio::test]
async fn test_http_error_is_a_download_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _storage) = media_store(dir.path(), 10_000);

    let result = store
        .download(
            &Url::parse(&format!("{}/missing.png", server.uri())).unwrap(),
            MediaType::Images,
        )
        .await;

    assert!(matches!(result, Err(ScrapeError::Download { .. })));
}
