use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use parking_lot::Mutex;

/// Entries kept before the oldest stored response is dropped
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 256;

/// Last body and `ETag` per request URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub etag: String,
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CachedResponse>,
    /// Keys from least to most recently stored
    order: VecDeque<String>,
}

impl Entries {
    fn unlink(&mut self, url: &str) {
        if let Some(pos) = self.order.iter().position(|key| key == url) {
            self.order.remove(pos);
        }
    }
}

/// Bounded store of conditional GET responses. Once full, storing a new URL
/// evicts the one stored longest ago.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RESPONSE_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        self.entries.lock().map.get(url).cloned()
    }

    pub fn put(&self, url: String, etag: String, body: Bytes) {
        let mut entries = self.entries.lock();
        if entries.map.contains_key(&url) {
            entries.unlink(&url);
        } else {
            while entries.map.len() >= self.capacity {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                entries.map.remove(&oldest);
            }
        }
        entries.order.push_back(url.clone());
        entries.map.insert(url, CachedResponse { etag, body });
    }

    pub fn remove(&self, url: &str) {
        let mut entries = self.entries.lock();
        if entries.map.remove(url).is_some() {
            entries.unlink(url);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.map.clear();
        entries.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map.is_empty()
    }
}
