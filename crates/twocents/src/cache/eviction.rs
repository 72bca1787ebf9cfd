//! # Eviction
//!
//! Age and size limits for the cache directory. Recency is the file's
//! modification time, which cache hits refresh.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::io;
use tracing::trace;

use super::types::{CacheKey, MediaKind, is_hash};

/// A cached file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// What a sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub evicted: usize,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.evicted
    }
}

/// Entry count and total size of the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    pub entries: usize,
    pub total_bytes: u64,
}

impl CacheUsage {
    pub fn of(files: &[StoredFile]) -> Self {
        Self {
            entries: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
        }
    }
}

/// Lists cache files in `dir`. Anything not named `<sha256>.<ext>` with a
/// known extension is ignored.
pub async fn scan(dir: &Path) -> io::Result<Vec<StoredFile>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(key) = key_for_path(&path) else {
            trace!(path = ?path, "Skipping non-cache file");
            continue;
        };

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        files.push(StoredFile {
            key,
            path,
            size: metadata.len(),
            modified: metadata.modified()?,
        });
    }

    Ok(files)
}

fn key_for_path(path: &Path) -> Option<CacheKey> {
    let stem = path.file_stem()?.to_str()?;
    let kind = MediaKind::from_extension(path.extension()?.to_str()?)?;
    is_hash(stem).then(|| CacheKey::from_hash(kind, stem))
}

/// Files selected for eviction and the ones that stay
#[derive(Debug, Clone, Default)]
pub struct EvictionPlan {
    pub evict: Vec<StoredFile>,
    pub keep: Vec<StoredFile>,
    /// Leading entries of `evict` removed for age rather than size
    pub expired: usize,
}

/// Splits `files` into the ones to evict and the ones to keep.
///
/// Files older than `max_age` go first. The rest are evicted least recently
/// used first until the total size fits `max_size_bytes` (zero means no limit).
pub fn plan(
    mut files: Vec<StoredFile>,
    max_size_bytes: u64,
    max_age: Option<Duration>,
    now: SystemTime,
) -> EvictionPlan {
    files.sort_by_key(|f| f.modified);

    let (mut evict, mut keep): (Vec<_>, Vec<_>) = match max_age {
        Some(max_age) => files.into_iter().partition(|f| {
            now.duration_since(f.modified)
                .is_ok_and(|age| age > max_age)
        }),
        None => (Vec::new(), files),
    };
    let expired = evict.len();

    if max_size_bytes > 0 {
        let mut total: u64 = keep.iter().map(|f| f.size).sum();
        let mut cut = 0;
        while total > max_size_bytes && cut < keep.len() {
            total -= keep[cut].size;
            cut += 1;
        }
        let rest = keep.split_off(cut);
        evict.append(&mut keep);
        keep = rest;
    }

    EvictionPlan {
        evict,
        keep,
        expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(n: u8, size: u64, age_secs: u64, now: SystemTime) -> StoredFile {
        let hash = format!("{n:02x}").repeat(32);
        StoredFile {
            key: CacheKey::from_hash(MediaKind::Image, hash.clone()),
            path: PathBuf::from(format!("{hash}.jpeg")),
            size,
            modified: now - Duration::from_secs(age_secs),
        }
    }

    #[test]
    fn test_age_then_lru() {
        let now = SystemTime::now();
        let files = vec![
            file(1, 100, 10, now),
            file(2, 100, 1_000, now),
            file(3, 100, 50, now),
            file(4, 100, 20, now),
        ];

        let plan = plan(files, 150, Some(Duration::from_secs(500)), now);
        assert_eq!(plan.expired, 1);
        let evicted: Vec<_> = plan.evict.iter().map(|f| f.key.hash[..2].to_owned()).collect();
        assert_eq!(evicted, ["02", "03", "04"]);
        assert_eq!(plan.keep.len(), 1);
        assert_eq!(&plan.keep[0].key.hash[..2], "01");
    }

    #[test]
    fn test_zero_size_means_unbounded() {
        let now = SystemTime::now();
        let files = vec![file(1, 10_000, 10, now), file(2, 10_000, 20, now)];
        let plan = plan(files, 0, None, now);
        assert!(plan.evict.is_empty());
        assert_eq!(plan.keep.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let hash = "ab".repeat(32);
        fs::write(dir.path().join(format!("{hash}.jpeg")), b"img").await.unwrap();
        fs::write(dir.path().join(format!("{hash}.jpeg.tmp")), b"partial").await.unwrap();
        fs::write(dir.path().join("validators.json"), b"{}").await.unwrap();
        fs::write(dir.path().join(format!("{hash}.gif")), b"x").await.unwrap();

        let files = scan(dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key.kind, MediaKind::Image);
        assert_eq!(files[0].size, 3);
        assert_eq!(CacheUsage::of(&files).total_bytes, 3);
    }

    #[tokio::test]
    async fn test_scan_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = scan(&dir.path().join("absent")).await.unwrap();
        assert!(files.is_empty());
    }
}
