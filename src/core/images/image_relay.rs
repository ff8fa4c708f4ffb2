// Image relay: turns an upstream cover image into a Discord CDN URL exactly once.
//
// The flow for an image we have never seen:
// 1. Fetch the bytes from the upstream servers
// 2. Write them to a uniquely named temporary file in the cache directory
// 3. Upload that file to the CDN
// 4. Remember the CDN URL (in-process and in the persistent store)
// 5. Delete the temporary file, whatever happened in step 3
//
// Every later request for the same image is answered from memory.

use crate::core::levels::{Guid, ServerRegion};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// What the relay needs to know about a cover image.
#[derive(Debug, Clone)]
pub struct CoverImageRequest {
    pub guid: Guid,
    pub region: ServerRegion,
    /// Upstream URL of the image. This is the cache key.
    pub source_url: String,
}

/// Raw bytes as they came off the wire.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A source URL we have already uploaded, and where it ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedImage {
    pub source_url: String,
    pub guid: String,
    pub region: ServerRegion,
    pub cdn_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Could not fetch cover image: {0}")]
    UpstreamUnavailable(String),

    #[error("Upload to CDN failed: {0}")]
    UploadFailed(String),

    #[error("Temporary file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image cache storage error: {0}")]
    Storage(String),
}

impl ImageError {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageError::UpstreamUnavailable(_) => "UpstreamUnavailableError",
            ImageError::UploadFailed(_) => "UploadFailedError",
            ImageError::Io(_) => "TempFileError",
            ImageError::Storage(_) => "StorageError",
        }
    }
}

// ============================================================================
// PORTS
// ============================================================================

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError>;
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Upload the file at `path` under `filename` and return its durable URL.
    async fn upload(&self, path: &Path, filename: &str) -> Result<String, ImageError>;
}

/// Persistent mapping from source URL to CDN URL, so restarts don't re-upload.
#[async_trait]
pub trait ImageCacheStore: Send + Sync {
    async fn get(&self, source_url: &str) -> Result<Option<CachedImage>, ImageError>;
    async fn save(&self, image: CachedImage) -> Result<(), ImageError>;
}

/// What the command router depends on. Implemented by [`ImageRelay`].
#[async_trait]
pub trait CoverImageResolver: Send + Sync {
    async fn resolve(&self, request: &CoverImageRequest) -> Result<String, ImageError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ImageRelay<F: ImageFetcher, U: ImageUploader, C: ImageCacheStore> {
    fetcher: F,
    uploader: U,
    store: C,
    cache_dir: PathBuf,
    /// Source URL -> resolved CDN URL.
    ///
    /// Concurrent requests for one key share the same cell and wait on a single
    /// upload. A failed attempt leaves the cell empty so the next request retries.
    resolved: DashMap<String, Arc<OnceCell<String>>>,
}

impl<F: ImageFetcher, U: ImageUploader, C: ImageCacheStore> ImageRelay<F, U, C> {
    pub fn new(fetcher: F, uploader: U, store: C, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            uploader,
            store,
            cache_dir: cache_dir.into(),
            resolved: DashMap::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    async fn load_or_upload(&self, request: &CoverImageRequest) -> Result<String, ImageError> {
        match self.store.get(&request.source_url).await {
            Ok(Some(cached)) => {
                tracing::debug!(guid = %request.guid, "Cover image served from persistent cache");
                return Ok(cached.cdn_url);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Image cache lookup failed, uploading anyway: {}", e),
        }

        let fetched = self.fetcher.fetch(&request.source_url).await?;
        if fetched.bytes.is_empty() {
            return Err(ImageError::UpstreamUnavailable(
                "downloaded content is empty".to_string(),
            ));
        }

        let extension = guess_extension(&fetched.bytes, fetched.content_type.as_deref());
        let temp = self.write_temp_file(request, &extension, &fetched.bytes).await?;
        let filename = format!("{}_{}.{}", request.guid, request.region, extension);

        // If this future is dropped mid-upload, `temp` is dropped with it and the
        // file goes away. On the normal path we close it explicitly to log failures.
        let upload = self.uploader.upload(temp.path(), &filename).await;
        let temp_path = temp.path().to_path_buf();
        match temp.close() {
            Ok(()) => tracing::debug!(path = %temp_path.display(), "Removed temporary image"),
            Err(e) => tracing::warn!(
                path = %temp_path.display(),
                "Failed to remove temporary image: {}",
                e
            ),
        }
        let cdn_url = upload?;

        tracing::info!(
            guid = %request.guid,
            region = %request.region,
            "Uploaded cover image to CDN"
        );

        let now = Utc::now();
        let record = CachedImage {
            source_url: request.source_url.clone(),
            guid: request.guid.to_string(),
            region: request.region,
            cdn_url: cdn_url.clone(),
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.store.save(record).await {
            tracing::warn!(guid = %request.guid, "Failed to persist cached image URL: {}", e);
        }

        Ok(cdn_url)
    }

    async fn write_temp_file(
        &self,
        request: &CoverImageRequest,
        extension: &str,
        bytes: &[u8],
    ) -> Result<tempfile::NamedTempFile, ImageError> {
        let dir = self.cache_dir.clone();
        let prefix = format!("{}_{}_", request.guid, request.region);
        let suffix = format!(".{}", extension);
        let bytes = bytes.to_vec();

        // File creation and the write are blocking calls; keep them off the
        // runtime threads. If this future is dropped, the finished task's
        // NamedTempFile is dropped with the JoinHandle and the file removed.
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<tempfile::NamedTempFile> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        Ok(file)
    }
}

#[async_trait]
impl<F: ImageFetcher, U: ImageUploader, C: ImageCacheStore> CoverImageResolver
    for ImageRelay<F, U, C>
{
    async fn resolve(&self, request: &CoverImageRequest) -> Result<String, ImageError> {
        // Clone the Arc out so the DashMap shard lock is released before awaiting.
        let cell = self
            .resolved
            .entry(request.source_url.clone())
            .or_default()
            .clone();

        let url = cell
            .get_or_try_init(|| self.load_or_upload(request))
            .await?;
        Ok(url.clone())
    }
}

/// Pick a file extension from the magic bytes, then the content type, else `bin`.
pub fn guess_extension(bytes: &[u8], content_type: Option<&str>) -> String {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "png".to_string();
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "jpg".to_string();
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "gif".to_string();
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "webp".to_string();
    }

    if let Some((main, subtype)) = content_type.and_then(|ct| ct.split_once('/')) {
        if main.trim() == "image" {
            let subtype = subtype.split(';').next().unwrap_or("").trim();
            return match subtype {
                "jpeg" => "jpg".to_string(),
                "" => "bin".to_string(),
                other => other.to_string(),
            };
        }
    }

    "bin".to_string()
}
