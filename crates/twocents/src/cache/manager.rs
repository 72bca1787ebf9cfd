//! # Media Cache Manager
//!
//! Resolves remote media to local files. A cached file is revalidated with a
//! conditional GET on every lookup: `304` keeps it, `200` replaces it, any
//! other status drops it and downloads again. When revalidation gets no
//! response at all the local copy is served as is. A failed download
//! propagates and never leaves a partial file behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use reqwest::StatusCode;
use tokio::fs;
use tokio::io;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::eviction::{self, CacheUsage, SweepReport};
use super::types::{
    CacheConfig, CacheEntry, CacheKey, CacheStatus, CachedMedia, MediaKind, Revalidation,
};
use super::utils::{apply_validators, extract_validators};
use super::validators::ValidatorStore;
use crate::error::{ApiError, Result};
use crate::link::{LinkMetadata, LinkMetadataProvider};
use crate::request::classify;
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Clone)]
pub struct MediaCacheManager {
    config: Arc<CacheConfig>,
    cache_dir: PathBuf,
    transport: Arc<dyn Transport>,
    validators: Arc<dyn ValidatorStore>,
    link_provider: Option<Arc<dyn LinkMetadataProvider>>,
}

impl MediaCacheManager {
    /// Create a cache manager, creating the cache directory if needed
    pub async fn new(
        config: CacheConfig,
        transport: Arc<dyn Transport>,
        validators: Arc<dyn ValidatorStore>,
    ) -> io::Result<Self> {
        let cache_dir = config.directory();
        fs::create_dir_all(&cache_dir).await?;

        debug!(dir = ?cache_dir, "Media cache ready");
        Ok(Self {
            config: Arc::new(config),
            cache_dir,
            transport,
            validators,
            link_provider: None,
        })
    }

    /// Provider used to build link previews for [`MediaKind::Link`]
    pub fn with_link_provider(mut self, provider: Arc<dyn LinkMetadataProvider>) -> Self {
        self.link_provider = Some(provider);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.to_filename())
    }

    /// Local path of an up-to-date copy of `remote_url`
    pub async fn fetch_cached_location(
        &self,
        remote_url: &str,
        kind: MediaKind,
    ) -> Result<PathBuf> {
        self.fetch(remote_url, kind).await.map(|media| media.path)
    }

    /// Like [`fetch_cached_location`](Self::fetch_cached_location), reporting
    /// how the file was obtained
    pub async fn fetch(&self, remote_url: &str, kind: MediaKind) -> Result<CachedMedia> {
        let mut target = Url::parse(remote_url)?;
        target.set_fragment(None);

        let key = CacheKey::new(kind, &target);
        let path = self.path_for(&key);

        let status = match kind {
            MediaKind::Link => self.fetch_link(&key, &path, &target).await?,
            MediaKind::Image | MediaKind::Video => self.fetch_media(&key, &path, &target).await?,
        };

        debug!(url = %target, kind = ?kind, status = ?status, "Resolved cached media");
        Ok(CachedMedia { key, path, status })
    }

    /// Preview metadata for a shared link, served from the cache
    pub async fn fetch_link_metadata(&self, page_url: &str) -> Result<LinkMetadata> {
        let media = self.fetch(page_url, MediaKind::Link).await?;
        let bytes = fs::read(&media.path).await?;

        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!(path = ?media.path, error = %e, "Dropping unreadable link metadata");
                self.discard(&media.key, &media.path).await;
                Err(e.into())
            }
        }
    }

    async fn fetch_media(&self, key: &CacheKey, path: &Path, target: &Url) -> Result<CacheStatus> {
        if fs::try_exists(path).await? {
            match self.revalidate(key, target).await {
                Revalidation::NotModified => {
                    self.touch(path).await;
                    return Ok(CacheStatus::Validated);
                }
                Revalidation::Modified(response) => {
                    self.store(key, path, &response.body, &response).await?;
                    return Ok(CacheStatus::Refreshed);
                }
                Revalidation::Rejected(status) => {
                    debug!(
                        url = %target,
                        status = %status,
                        "Cached copy rejected, downloading again"
                    );
                    self.discard(key, path).await;
                }
                Revalidation::Failed(e) => {
                    warn!(url = %target, error = %e, "Revalidation failed, using cached copy");
                    return Ok(CacheStatus::Stale);
                }
            }
        }

        let response = self.download(target).await?;
        self.store(key, path, &response.body, &response).await?;
        Ok(CacheStatus::Miss)
    }

    /// The page is revalidated like media; the stored payload is the preview
    /// produced by the link provider from a separate request.
    async fn fetch_link(&self, key: &CacheKey, path: &Path, target: &Url) -> Result<CacheStatus> {
        let provider = self
            .link_provider
            .as_ref()
            .ok_or_else(|| ApiError::Client("no link metadata provider configured".into()))?;

        let (response, status) = if fs::try_exists(path).await? {
            match self.revalidate(key, target).await {
                Revalidation::NotModified => {
                    self.touch(path).await;
                    return Ok(CacheStatus::Validated);
                }
                Revalidation::Modified(response) => (response, CacheStatus::Refreshed),
                Revalidation::Rejected(status) => {
                    debug!(
                        url = %target,
                        status = %status,
                        "Cached preview rejected, fetching again"
                    );
                    self.discard(key, path).await;
                    (self.download(target).await?, CacheStatus::Miss)
                }
                Revalidation::Failed(e) => {
                    warn!(url = %target, error = %e, "Revalidation failed, using cached preview");
                    return Ok(CacheStatus::Stale);
                }
            }
        } else {
            (self.download(target).await?, CacheStatus::Miss)
        };

        let metadata = match provider.fetch_metadata(target).await {
            Ok(metadata) => metadata,
            Err(e) => {
                // The page changed, so an older preview must not be served again
                if status == CacheStatus::Refreshed {
                    warn!(
                        url = %target,
                        error = %e,
                        "Preview refresh failed, dropping cached preview"
                    );
                    self.discard(key, path).await;
                    if let Err(e) = self.validators.flush().await {
                        warn!(error = %e, "Failed to persist cache validators");
                    }
                }
                return Err(e);
            }
        };
        let json = serde_json::to_vec(&metadata)?;
        self.store(key, path, &json, &response).await?;
        Ok(status)
    }

    /// Conditional GET with the validators stored for `key`. Without stored
    /// validators the request is unconditional and a `200` counts as modified.
    pub async fn revalidate(&self, key: &CacheKey, target: &Url) -> Revalidation {
        let validators = self.validators.load(key);
        let mut request = HttpRequest::get(target.clone());
        if let Err(e) = apply_validators(&mut request, &validators) {
            return Revalidation::Failed(e);
        }

        match self.transport.execute(request).await {
            Ok(response) => match response.status {
                StatusCode::NOT_MODIFIED => Revalidation::NotModified,
                StatusCode::OK if !response.body.is_empty() => Revalidation::Modified(response),
                status => Revalidation::Rejected(status),
            },
            Err(e) => Revalidation::Failed(e),
        }
    }

    async fn download(&self, target: &Url) -> Result<HttpResponse> {
        let response = self.transport.execute(HttpRequest::get(target.clone())).await?;
        // classify consumes the response; keep the headers for the validators
        let headers = response.headers.clone();
        let status = response.status;
        let body = classify(response)?.require_body()?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Writes `data` to `path` through a temp file and replaces the validators
    /// with the ones carried by `response`.
    async fn store(
        &self,
        key: &CacheKey,
        path: &Path,
        data: &[u8],
        response: &HttpResponse,
    ) -> Result<()> {
        write_atomic(path, data).await?;

        let validators = extract_validators(&response.headers);
        self.validators.store(key, &validators);
        if let Err(e) = self.validators.flush().await {
            warn!(error = %e, "Failed to persist cache validators");
        }

        debug!(key = ?key, size = data.len(), "Stored cache entry");
        Ok(())
    }

    async fn discard(&self, key: &CacheKey, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to remove cache file"),
        }
        self.validators.forget(key);
    }

    /// Marks a file as recently used for eviction
    async fn touch(&self, path: &Path) {
        let path = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            std::fs::File::options()
                .write(true)
                .open(&path)?
                .set_modified(SystemTime::now())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to refresh cache file time"),
            Err(e) => warn!(error = %e, "Cache touch task failed"),
        }
    }

    /// What is cached for `remote_url`, without touching the network
    pub async fn entry(&self, remote_url: &str, kind: MediaKind) -> Result<Option<CacheEntry>> {
        let mut target = Url::parse(remote_url)?;
        target.set_fragment(None);
        let key = CacheKey::new(kind, &target);
        let path = self.path_for(&key);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CacheEntry {
            validators: self.validators.load(&key),
            key,
            path,
            size: metadata.len(),
            modified: metadata.modified()?,
        }))
    }

    /// Drop the cached copy of `remote_url`
    pub async fn remove(&self, remote_url: &str, kind: MediaKind) -> Result<()> {
        let mut target = Url::parse(remote_url)?;
        target.set_fragment(None);
        let key = CacheKey::new(kind, &target);
        let path = self.path_for(&key);

        self.discard(&key, &path).await;
        self.validators.flush().await?;
        Ok(())
    }

    /// Apply the age and size limits
    pub async fn sweep(&self) -> Result<SweepReport> {
        let files = eviction::scan(&self.cache_dir).await?;
        let scanned = files.len();
        let plan = eviction::plan(
            files,
            self.config.max_size_bytes,
            self.config.max_age,
            SystemTime::now(),
        );

        let mut report = SweepReport {
            scanned,
            remaining_bytes: plan.keep.iter().map(|f| f.size).sum(),
            ..Default::default()
        };

        for (index, file) in plan.evict.iter().enumerate() {
            match fs::remove_file(&file.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = ?file.path, error = %e, "Failed to evict cache file");
                    report.remaining_bytes += file.size;
                    continue;
                }
            }
            self.validators.forget(&file.key);
            report.freed_bytes += file.size;
            if index < plan.expired {
                report.expired += 1;
            } else {
                report.evicted += 1;
            }
        }

        if report.removed() > 0 {
            self.validators.flush().await?;
            info!(
                expired = report.expired,
                evicted = report.evicted,
                freed_bytes = report.freed_bytes,
                "Swept media cache"
            );
        }

        Ok(report)
    }

    /// Remove every cached file and validator
    pub async fn clear(&self) -> Result<usize> {
        let files = eviction::scan(&self.cache_dir).await?;
        let mut removed = 0;

        for file in &files {
            match fs::remove_file(&file.path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = ?file.path, error = %e, "Failed to remove cache file"),
            }
        }

        self.validators.clear();
        self.validators.flush().await?;

        debug!(count = removed, "Cleared media cache");
        Ok(removed)
    }

    /// Number and total size of cached files
    pub async fn usage(&self) -> Result<CacheUsage> {
        let files = eviction::scan(&self.cache_dir).await?;
        Ok(CacheUsage::of(&files))
    }

    /// Start a background task sweeping the cache every `sweep_interval`
    pub fn start_maintenance_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    warn!("Cache maintenance error: {}", e);
                }
            }
        })
    }
}

/// Writes through a temp file unique to this call, so concurrent writers of
/// one entry never share it; the last rename wins.
async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    if let Err(e) = fs::write(&temp_path, data).await {
        warn!(path = ?temp_path, error = %e, "Failed to write cache file");
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        warn!(from = ?temp_path, to = ?path, error = %e, "Failed to rename temporary cache file");
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

/// `<file>.<uuid>.tmp` next to `path`. The `.tmp` extension keeps it out of
/// [`eviction::scan`].
fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    PathBuf::from(temp_name)
}
