//! Media download records and the discriminated payload attached to a post.
//!
//! The payload shape depends on the owning post's `media` field, so decoding
//! reads that discriminator first and only then interprets the array. A payload
//! that does not fit degrades to an empty list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::post::{Media, Post};
use crate::error::{ApiError, soft};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDownload {
    pub id: Uuid,
    pub post_id: Uuid,
    pub media_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDownload {
    pub id: Uuid,
    pub post_id: Uuid,
    pub media_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDownload {
    pub id: Uuid,
    pub post_id: Uuid,
    pub media_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDownload {
    pub id: Uuid,
    pub post_id: Uuid,
    pub text: String,
}

/// Media records of one post, one variant per media kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MediaPayload {
    Image(Vec<ImageDownload>),
    Video(Vec<VideoDownload>),
    Link(Vec<LinkDownload>),
    Text(Vec<TextDownload>),
    Other,
}

impl MediaPayload {
    /// Decodes `value` as the record list for `media`.
    ///
    /// Never fails: a null payload, an `OTHER` post or a shape mismatch
    /// produces an empty payload and the cause is logged.
    pub fn decode(media: Media, value: Value) -> Self {
        if value.is_null() {
            debug!(%media, "Post carries no media payload");
            return Self::empty(media);
        }

        let context = format!("Failed to decode {media} media payload");
        match media {
            Media::Image => Self::Image(decode_list(&context, value)),
            Media::Video => Self::Video(decode_list(&context, value)),
            Media::Link => Self::Link(decode_list(&context, value)),
            Media::Text => Self::Text(decode_list(&context, value)),
            Media::Other => MediaPayload::Other,
        }
    }

    /// Decodes a raw response body, see [`MediaPayload::decode`]
    pub fn from_slice(media: Media, bytes: &[u8]) -> Self {
        match soft(
            "Media payload is not valid JSON",
            serde_json::from_slice::<Value>(bytes).map_err(ApiError::from),
        ) {
            Some(value) => Self::decode(media, value),
            None => Self::empty(media),
        }
    }

    pub fn empty(media: Media) -> Self {
        match media {
            Media::Image => MediaPayload::Image(Vec::new()),
            Media::Video => MediaPayload::Video(Vec::new()),
            Media::Link => MediaPayload::Link(Vec::new()),
            Media::Text => MediaPayload::Text(Vec::new()),
            Media::Other => MediaPayload::Other,
        }
    }

    pub fn kind(&self) -> Media {
        match self {
            MediaPayload::Image(_) => Media::Image,
            MediaPayload::Video(_) => Media::Video,
            MediaPayload::Link(_) => Media::Link,
            MediaPayload::Text(_) => Media::Text,
            MediaPayload::Other => Media::Other,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MediaPayload::Image(v) => v.len(),
            MediaPayload::Video(v) => v.len(),
            MediaPayload::Link(v) => v.len(),
            MediaPayload::Text(v) => v.len(),
            MediaPayload::Other => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn images(&self) -> &[ImageDownload] {
        match self {
            MediaPayload::Image(v) => v,
            _ => &[],
        }
    }

    pub fn videos(&self) -> &[VideoDownload] {
        match self {
            MediaPayload::Video(v) => v,
            _ => &[],
        }
    }

    pub fn links(&self) -> &[LinkDownload] {
        match self {
            MediaPayload::Link(v) => v,
            _ => &[],
        }
    }

    pub fn texts(&self) -> &[TextDownload] {
        match self {
            MediaPayload::Text(v) => v,
            _ => &[],
        }
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(context: &str, value: Value) -> Vec<T> {
    soft(context, serde_json::from_value(value).map_err(ApiError::from)).unwrap_or_default()
}

/// A post together with its decoded media
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithMedia {
    pub post: Post,
    pub media: MediaPayload,
}

impl<'de> Deserialize<'de> for PostWithMedia {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            post: Post,
            #[serde(default)]
            media: Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        let media = MediaPayload::decode(raw.post.media, raw.media);
        Ok(PostWithMedia {
            post: raw.post,
            media,
        })
    }
}

/// One page of a group feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedPosts {
    #[serde(default)]
    pub posts: Vec<PostWithMedia>,
    /// Cursor for the next page; the server sends the nil UUID when there is none
    #[serde(
        default,
        deserialize_with = "nil_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub offset: Option<Uuid>,
    #[serde(default)]
    pub has_more: bool,
}

impl PaginatedPosts {
    /// Cursor to request the following page with, if any
    pub fn next_cursor(&self) -> Option<Uuid> {
        if self.has_more { self.offset } else { None }
    }
}

fn nil_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    let offset = Option::<Uuid>::deserialize(deserializer)?;
    Ok(offset.filter(|id| !id.is_nil()))
}
