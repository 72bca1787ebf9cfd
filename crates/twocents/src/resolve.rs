//! Turns a post's media payload into displayable items.

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::cache::{MediaCacheManager, MediaKind};
use crate::error::{Result, soft};
use crate::link::LinkMetadata;
use crate::models::MediaPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedMedia {
    Image { id: Uuid, path: PathBuf },
    Video { id: Uuid, path: PathBuf },
    Link { id: Uuid, metadata: LinkMetadata },
    Text { id: Uuid, text: String },
}

impl ResolvedMedia {
    pub fn id(&self) -> Uuid {
        match self {
            ResolvedMedia::Image { id, .. }
            | ResolvedMedia::Video { id, .. }
            | ResolvedMedia::Link { id, .. }
            | ResolvedMedia::Text { id, .. } => *id,
        }
    }
}

/// Resolves every record of `payload`. Any failure yields an empty list and
/// the cause is logged.
pub async fn resolve_media(
    payload: &MediaPayload,
    cache: &MediaCacheManager,
) -> Vec<ResolvedMedia> {
    soft("Failed to resolve post media", try_resolve(payload, cache).await).unwrap_or_default()
}

/// Resolves every record of `payload`, stopping at the first failure
pub async fn try_resolve(
    payload: &MediaPayload,
    cache: &MediaCacheManager,
) -> Result<Vec<ResolvedMedia>> {
    let mut resolved = Vec::with_capacity(payload.len());

    match payload {
        MediaPayload::Image(images) => {
            for image in images {
                let path = cache
                    .fetch_cached_location(&image.media_url, MediaKind::Image)
                    .await?;
                resolved.push(ResolvedMedia::Image { id: image.id, path });
            }
        }
        MediaPayload::Video(videos) => {
            for video in videos {
                let path = cache
                    .fetch_cached_location(&video.media_url, MediaKind::Video)
                    .await?;
                resolved.push(ResolvedMedia::Video { id: video.id, path });
            }
        }
        MediaPayload::Link(links) => {
            for link in links {
                let metadata = cache.fetch_link_metadata(&link.media_url).await?;
                resolved.push(ResolvedMedia::Link {
                    id: link.id,
                    metadata,
                });
            }
        }
        MediaPayload::Text(texts) => {
            resolved.extend(texts.iter().map(|t| ResolvedMedia::Text {
                id: t.id,
                text: t.text.clone(),
            }));
        }
        MediaPayload::Other => {}
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, MemoryValidatorStore};
    use crate::models::{ImageDownload, TextDownload};
    use crate::test_support::{ScriptedTransport, init_tracing, response};
    use std::sync::Arc;

    async fn cache(dir: &std::path::Path, transport: Arc<ScriptedTransport>) -> MediaCacheManager {
        init_tracing();
        let config = CacheConfig {
            cache_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        MediaCacheManager::new(config, transport, Arc::new(MemoryValidatorStore::new()))
            .await
            .unwrap()
    }

    fn image(url: &str) -> ImageDownload {
        ImageDownload {
            id: Uuid::new_v4(),
            post_id: Uuid::nil(),
            media_url: url.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_images_resolve_to_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.respond("https://cdn.example.com/a.jpeg", response(200, &[], b"a"));
        let cache = cache(dir.path(), transport).await;

        let payload = MediaPayload::Image(vec![image("https://cdn.example.com/a.jpeg")]);
        let resolved = resolve_media(&payload, &cache).await;

        assert_eq!(resolved.len(), 1);
        let ResolvedMedia::Image { path, .. } = &resolved[0] else {
            panic!("expected an image");
        };
        assert!(path.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_any_failure_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.respond("https://cdn.example.com/a.jpeg", response(200, &[], b"a"));
        let cache = cache(dir.path(), transport).await;

        let payload = MediaPayload::Image(vec![
            image("https://cdn.example.com/a.jpeg"),
            image("https://cdn.example.com/unreachable.jpeg"),
        ]);
        assert!(resolve_media(&payload, &cache).await.is_empty());
    }

    #[tokio::test]
    async fn test_text_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        let cache = cache(dir.path(), transport.clone()).await;

        let id = Uuid::new_v4();
        let payload = MediaPayload::Text(vec![TextDownload {
            id,
            post_id: Uuid::nil(),
            text: "two cents".into(),
        }]);
        let resolved = resolve_media(&payload, &cache).await;

        assert_eq!(
            resolved,
            vec![ResolvedMedia::Text {
                id,
                text: "two cents".into()
            }]
        );
        assert_eq!(transport.request_count(), 0);
    }
}
