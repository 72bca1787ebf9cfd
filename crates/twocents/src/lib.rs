//! # TwoCents client
//!
//! Client-side core of the TwoCents social app: an authenticated request
//! envelope for the REST API, multipart uploads, typed post/group/user models
//! and a disk cache for remote media that revalidates with conditional GETs.
//!
//! ## Features
//!
//! - Bearer-token request envelope with response classification
//! - Multipart uploads with boundary collision detection
//! - Media cache keyed by `sha256(normalized url)` with ETag / Last-Modified
//!   revalidation and size/age eviction
//! - Discriminated decoding of post media payloads
//! - Cursor-based feed paging

pub mod api;
pub mod auth;
pub mod builder;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod feed;
pub mod link;
pub mod models;
pub mod multipart;
pub mod request;
pub mod resolve;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::ApiClient;
pub use auth::{AuthError, SessionTokens, TokenProvider};
pub use builder::ClientConfigBuilder;
pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CacheStatus, CacheUsage, CachedMedia, JsonValidatorStore,
    MediaCacheManager, MediaKind, MemoryValidatorStore, Revalidation, SweepReport, ValidatorStore,
    Validators,
};
pub use config::ClientConfig;
pub use error::{ApiError, Result, soft};
pub use feed::{DayBucket, FeedPager, group_by_day};
pub use link::{HtmlMetadataProvider, LinkMetadata, LinkMetadataProvider};
pub use models::{
    AddPostRequest, FriendGroup, GroupMember, ImageDownload, LinkDownload, Media, MediaPayload,
    Member, PaginatedPosts, Post, PostRequest, PostWithMedia, Role, TextDownload, User,
    VideoDownload,
};
pub use multipart::{EncodedForm, MultipartForm};
pub use request::{ContentType, Payload, Request, classify};
pub use resolve::{ResolvedMedia, resolve_media};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, create_client};
