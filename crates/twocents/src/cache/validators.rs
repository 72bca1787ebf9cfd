//! # Validator Store
//!
//! Key-value store for the `ETag` / `Last-Modified` values of cached media.
//! Keys follow `<namespace>.<etag|lastModified>.<hash>`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::io;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{CacheKey, Validators};

#[async_trait]
pub trait ValidatorStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value; `None` removes the key
    fn set(&self, key: &str, value: Option<String>);

    fn remove(&self, key: &str);

    fn clear(&self);

    /// Persist pending changes
    async fn flush(&self) -> io::Result<()>;

    fn load(&self, key: &CacheKey) -> Validators {
        Validators {
            etag: self.get(&key.etag_key()),
            last_modified: self.get(&key.last_modified_key()),
        }
    }

    fn store(&self, key: &CacheKey, validators: &Validators) {
        self.set(&key.etag_key(), validators.etag.clone());
        self.set(&key.last_modified_key(), validators.last_modified.clone());
    }

    fn forget(&self, key: &CacheKey) {
        self.remove(&key.etag_key());
        self.remove(&key.last_modified_key());
    }
}

/// Validators kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryValidatorStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryValidatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ValidatorStore for MemoryValidatorStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<String>) {
        let mut entries = self.entries.write();
        match value {
            Some(value) => {
                entries.insert(key.to_owned(), value);
            }
            None => {
                entries.remove(key);
            }
        }
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    async fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Validators persisted as a JSON object on disk
#[derive(Debug)]
pub struct JsonValidatorStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    dirty: AtomicBool,
    /// Held from snapshot to rename so an older snapshot never lands last
    flush_lock: Mutex<()>,
}

impl JsonValidatorStore {
    /// Load the store from `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next flush.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();

        let entries = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        path = ?path,
                        error = %e,
                        "Failed to parse validator store, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };

        debug!(path = ?path, count = entries.len(), "Opened validator store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

#[async_trait]
impl ValidatorStore for JsonValidatorStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<String>) {
        let mut entries = self.entries.write();
        let changed = match value {
            Some(value) => entries.insert(key.to_owned(), value.clone()) != Some(value),
            None => entries.remove(key).is_some(),
        };
        if changed {
            self.mark_dirty();
        }
    }

    fn remove(&self, key: &str) {
        if self.entries.write().remove(key).is_some() {
            self.mark_dirty();
        }
    }

    fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            entries.clear();
            self.mark_dirty();
        }
    }

    async fn flush(&self) -> io::Result<()> {
        let _guard = self.flush_lock.lock().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let json = {
            let entries = self.entries.read();
            serde_json::to_vec_pretty(&*entries)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let temp_path = PathBuf::from(temp_name);
        if let Err(e) = fs::write(&temp_path, &json).await {
            warn!(path = ?temp_path, error = %e, "Failed to write validator store");
            self.mark_dirty();
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            warn!(
                from = ?temp_path,
                to = ?self.path,
                error = %e,
                "Failed to rename validator store"
            );
            let _ = fs::remove_file(&temp_path).await;
            self.mark_dirty();
            return Err(e);
        }

        debug!(path = ?self.path, "Flushed validator store");
        Ok(())
    }
}
