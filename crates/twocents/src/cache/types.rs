//! # Cache Types
//!
//! Keys, configuration and results shared by the media cache.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::ApiError;
use crate::transport::HttpResponse;

/// Kind of media stored in the cache; decides file extension and validator namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    /// Link preview metadata, stored as JSON
    Link,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Link];

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpeg",
            MediaKind::Video => "mp4",
            MediaKind::Link => "json",
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Link => "link",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        MediaKind::ALL.into_iter().find(|k| k.extension() == ext)
    }
}

/// Identifies one cached resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: MediaKind,
    /// Hex encoded `sha256` of the normalized URL
    pub hash: String,
}

impl CacheKey {
    pub fn new(kind: MediaKind, url: &Url) -> Self {
        Self::from_hash(kind, hash_url(url))
    }

    pub fn from_hash(kind: MediaKind, hash: impl Into<String>) -> Self {
        Self {
            kind,
            hash: hash.into(),
        }
    }

    /// `<hash>.<ext>`
    pub fn to_filename(&self) -> String {
        format!("{}.{}", self.hash, self.kind.extension())
    }

    pub fn etag_key(&self) -> String {
        format!("{}.etag.{}", self.kind.namespace(), self.hash)
    }

    pub fn last_modified_key(&self) -> String {
        format!("{}.lastModified.{}", self.kind.namespace(), self.hash)
    }
}

/// Canonical form of a URL for keying: fragment dropped, query pairs ordered
/// by name. Pairs sharing a name keep their relative order.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    if normalized.query().is_some() {
        let mut pairs: Vec<(String, String)> = normalized
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if pairs.is_empty() {
            normalized.set_query(None);
        } else {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            normalized.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    normalized.into()
}

/// Lowercase hex `sha256` of the normalized URL
pub fn hash_url(url: &Url) -> String {
    let digest = Sha256::digest(normalize_url(url).as_bytes());
    hex::encode(digest)
}

/// True for stems produced by [`hash_url`]
pub(crate) fn is_hash(stem: &str) -> bool {
    stem.len() == 64 && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding cached files; defaults to `<temp>/twocents-cache`
    pub cache_dir: Option<PathBuf>,

    /// Upper bound on the total size of cached files; zero disables the limit
    pub max_size_bytes: u64,

    /// Files not used for longer than this are evicted
    pub max_age: Option<Duration>,

    /// How often the background maintenance task sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_size_bytes: 500 * 1024 * 1024, // 500 MB
            max_age: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl CacheConfig {
    /// The configured directory or the default under the system temp dir
    pub fn directory(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("twocents-cache"))
    }
}

/// How a cached file was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Not cached before, downloaded in full
    Miss,
    /// Local copy confirmed by a 304
    Validated,
    /// Local copy replaced by a changed resource
    Refreshed,
    /// Revalidation failed, local copy used as is
    Stale,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct CachedMedia {
    pub key: CacheKey,
    pub path: PathBuf,
    pub status: CacheStatus,
}

/// Stored HTTP validators of an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// A cached file and what is known about it
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    pub validators: Validators,
}

impl CacheEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Outcome of a conditional GET against a cached resource
#[derive(Debug)]
pub enum Revalidation {
    /// 304, the local copy is current
    NotModified,
    /// 200 with a new body
    Modified(HttpResponse),
    /// Any other status; the local copy can no longer be trusted
    Rejected(StatusCode),
    /// No response at all
    Failed(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_query_order_does_not_change_key() {
        let a = url("https://cdn.example.com/img/1.jpeg?w=100&h=200&sig=abc");
        let b = url("https://cdn.example.com/img/1.jpeg?sig=abc&h=200&w=100");
        assert_eq!(hash_url(&a), hash_url(&b));
        assert_eq!(
            CacheKey::new(MediaKind::Image, &a),
            CacheKey::new(MediaKind::Image, &b)
        );
    }

    #[test]
    fn test_fragment_is_ignored_and_values_matter() {
        let a = url("https://cdn.example.com/v.mp4?x=1#t=10");
        let b = url("https://cdn.example.com/v.mp4?x=1");
        let c = url("https://cdn.example.com/v.mp4?x=2");
        assert_eq!(hash_url(&a), hash_url(&b));
        assert_ne!(hash_url(&b), hash_url(&c));
    }

    #[test]
    fn test_repeated_names_keep_relative_order() {
        let a = url("https://example.com/?b=1&a=2&a=1");
        assert_eq!(normalize_url(&a), "https://example.com/?a=2&a=1&b=1");
        let b = url("https://example.com/?a=1&a=2");
        assert_ne!(hash_url(&a), hash_url(&b));
    }

    #[test]
    fn test_key_layout() {
        let key = CacheKey::new(MediaKind::Video, &url("https://example.com/v.mp4"));
        assert!(is_hash(&key.hash));
        assert_eq!(key.to_filename(), format!("{}.mp4", key.hash));
        assert_eq!(key.etag_key(), format!("video.etag.{}", key.hash));
        assert_eq!(key.last_modified_key(), format!("video.lastModified.{}", key.hash));
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("json"), Some(MediaKind::Link));
        assert_eq!(MediaKind::from_extension("tmp"), None);
    }
}
