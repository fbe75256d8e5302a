//! Media file downloading and storage
//!
//! Downloads image and video files referenced by scraped results into a
//! local media directory, with:
//! - Streaming writes (files are hashed and spooled to disk chunk by
//!   chunk, never buffered whole in memory)
//! - Content-hash dedup: identical bytes from different URLs resolve to
//!   one stored file
//! - Per-type byte quotas with oldest-first eviction when a new file
//!   would overflow the quota

use crate::config::StorageConfig;
use crate::storage::{NewMediaAsset, SqliteStorage, Storage};
use crate::ScrapeError;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// The two media kinds with independent storage quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Images,
    Videos,
}

impl MediaType {
    /// Directory and database spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Videos => "videos",
        }
    }

    /// Expected content-type prefix for downloaded files of this kind
    fn content_type_prefix(&self) -> &'static str {
        match self {
            Self::Images => "image/",
            Self::Videos => "video/",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single download request
#[derive(Debug)]
pub struct DownloadOutcome {
    pub stored_path: PathBuf,
    pub byte_size: u64,
    /// True when the bytes matched an already-stored asset
    pub deduplicated: bool,
}

/// Downloads media files and maintains the on-disk store
///
/// Shared between job runs; the storage handle serializes index updates,
/// and its guard is never held across an await.
pub struct MediaStore {
    client: Client,
    root: PathBuf,
    image_quota: u64,
    video_quota: u64,
    download_timeout: Duration,
    storage: Arc<Mutex<SqliteStorage>>,
}

impl MediaStore {
    pub fn new(
        client: Client,
        config: &StorageConfig,
        download_timeout: Duration,
        storage: Arc<Mutex<SqliteStorage>>,
    ) -> Self {
        Self {
            client,
            root: PathBuf::from(&config.media_root),
            image_quota: config.image_quota_bytes,
            video_quota: config.video_quota_bytes,
            download_timeout,
            storage,
        }
    }

    fn quota_for(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Images => self.image_quota,
            MediaType::Videos => self.video_quota,
        }
    }

    /// Downloads one media file, dedupes it, and enforces the quota
    ///
    /// # Errors
    ///
    /// * [`ScrapeError::Download`] - HTTP failure or a content type that
    ///   does not match the requested media kind
    /// * [`ScrapeError::QuotaExceeded`] - the file alone is larger than
    ///   the entire quota for its type, so no amount of eviction helps
    pub async fn download(
        &self,
        url: &Url,
        media_type: MediaType,
    ) -> crate::Result<DownloadOutcome> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::Download {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Download {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        check_content_type(url, media_type, content_type.as_deref())?;

        let type_dir = self.root.join(media_type.as_str());
        std::fs::create_dir_all(&type_dir)?;

        // Spool to a temp file in the final directory so the rename on
        // persist stays on one filesystem
        let mut spool = tempfile::NamedTempFile::new_in(&type_dir)?;
        let mut hasher = Sha256::new();
        let mut byte_size: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ScrapeError::Download {
                url: url.to_string(),
                message: format!("body read failed: {e}"),
            })?;
            hasher.update(&chunk);
            spool.write_all(&chunk)?;
            byte_size += chunk.len() as u64;
        }
        spool.flush()?;

        let content_hash = hex::encode(hasher.finalize());
        let quota = self.quota_for(media_type);
        let extension = file_extension(url, content_type.as_deref(), media_type);
        let final_path = type_dir.join(format!("{content_hash}.{extension}"));

        // Dedup lookup, headroom check, persist, and index insert all run
        // under one guard: concurrent downloads of a type serialize here,
        // and the headroom a download sees is the headroom it commits into
        {
            let mut storage = lock_storage(&self.storage);

            // Dedup before touching the quota: identical bytes cost nothing
            if let Some(existing) = storage.find_media_by_hash(&content_hash)? {
                tracing::debug!(
                    "Media from {} matched stored asset {} ({} bytes)",
                    url,
                    existing.content_hash,
                    existing.byte_size
                );
                return Ok(DownloadOutcome {
                    stored_path: PathBuf::from(existing.stored_path),
                    byte_size: existing.byte_size,
                    deduplicated: true,
                });
            }

            if byte_size > quota {
                return Err(ScrapeError::QuotaExceeded {
                    media_type: media_type.as_str().to_string(),
                });
            }
            evict_until_fits(&mut storage, media_type, byte_size, quota)?;

            spool.persist(&final_path).map_err(|e| e.error)?;
            storage.insert_media_asset(&NewMediaAsset {
                content_hash,
                media_type: media_type.as_str().to_string(),
                stored_path: final_path.to_string_lossy().into_owned(),
                byte_size,
                source_url: url.to_string(),
            })?;
        }

        tracing::info!("Stored {} media file ({} bytes) from {}", media_type, byte_size, url);
        Ok(DownloadOutcome {
            stored_path: final_path,
            byte_size,
            deduplicated: false,
        })
    }
}

/// Deletes oldest assets of a type until the incoming file fits
///
/// Runs with the caller's storage guard held, together with the insert
/// that consumes the freed space.
fn evict_until_fits(
    storage: &mut SqliteStorage,
    media_type: MediaType,
    incoming: u64,
    quota: u64,
) -> crate::Result<()> {
    let mut used = storage.media_usage_bytes(media_type.as_str())?;
    if used + incoming <= quota {
        return Ok(());
    }

    for asset in storage.list_media_oldest_first(media_type.as_str())? {
        if used + incoming <= quota {
            break;
        }

        if let Err(e) = std::fs::remove_file(&asset.stored_path) {
            // The index row goes regardless so accounting stays honest
            tracing::warn!("Failed to remove evicted file {}: {}", asset.stored_path, e);
        }
        storage.delete_media_asset(asset.id)?;
        used = used.saturating_sub(asset.byte_size);
        tracing::info!(
            "Evicted {} asset {} ({} bytes) to stay under quota",
            media_type,
            asset.content_hash,
            asset.byte_size
        );
    }

    Ok(())
}

fn lock_storage(storage: &Arc<Mutex<SqliteStorage>>) -> std::sync::MutexGuard<'_, SqliteStorage> {
    match storage.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Rejects responses whose declared type contradicts the requested kind
///
/// Missing and generic binary content types pass; servers frequently get
/// these wrong in the lenient direction but a page served as text/html
/// for an image URL is a broken link, not an image.
fn check_content_type(
    url: &Url,
    media_type: MediaType,
    content_type: Option<&str>,
) -> crate::Result<()> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase();

    if essence.is_empty()
        || essence == "application/octet-stream"
        || essence.starts_with(media_type.content_type_prefix())
    {
        return Ok(());
    }

    Err(ScrapeError::Download {
        url: url.to_string(),
        message: format!("expected {} content, got {}", media_type, essence),
    })
}

/// Picks a file extension from the URL path, then the content type
fn file_extension(url: &Url, content_type: Option<&str>, media_type: MediaType) -> String {
    let last_segment = url.path().rsplit('/').next().unwrap_or("");
    if let Some((_, ext)) = last_segment.rsplit_once('.') {
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_lowercase();
        }
    }

    if let Some(content_type) = content_type {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        if let Some(subtype) = essence.strip_prefix(media_type.content_type_prefix()) {
            let subtype = subtype.split('+').next().unwrap_or(subtype);
            match subtype {
                "jpeg" => return "jpg".to_string(),
                "svg" => return "svg".to_string(),
                s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => {
                    return s.to_lowercase()
                }
                _ => {}
            }
        }
    }

    "bin".to_string()
}
