//! # Media Cache
//!
//! Disk cache for remote images, videos and link previews. Files are named
//! `<sha256(normalized url)>.<ext>`; their HTTP validators live in a
//! [`ValidatorStore`] handed to the [`MediaCacheManager`].

mod eviction;
mod manager;
mod types;
mod utils;
mod validators;

pub use eviction::{CacheUsage, EvictionPlan, StoredFile, SweepReport};
pub use manager::MediaCacheManager;
pub use types::{
    CacheConfig, CacheEntry, CacheKey, CacheStatus, CachedMedia, MediaKind, Revalidation,
    Validators, hash_url, normalize_url,
};
pub use utils::{apply_validators, extract_validators};
pub use validators::{JsonValidatorStore, MemoryValidatorStore, ValidatorStore};
