use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Media kind of a post. Unknown kinds decode as [`Media::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Media {
    Image,
    Video,
    Text,
    Link,
    #[serde(other)]
    Other,
}

impl Media {
    pub fn as_str(&self) -> &'static str {
        match self {
            Media::Image => "IMAGE",
            Media::Video => "VIDEO",
            Media::Text => "TEXT",
            Media::Link => "LINK",
            Media::Other => "OTHER",
        }
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Media {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(Media::Image),
            "VIDEO" => Ok(Media::Video),
            "TEXT" => Ok(Media::Text),
            "LINK" => Ok(Media::Link),
            "OTHER" => Ok(Media::Other),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media: Media,
    #[serde(with = "crate::codec::iso8601")]
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Body of `post/create-post`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub media: Media,
    pub caption: Option<String>,
    pub groups: Vec<Uuid>,
}

impl PostRequest {
    pub fn new(media: Media, groups: Vec<Uuid>) -> Self {
        Self {
            media,
            caption: None,
            groups,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Body of `group/add-post`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPostRequest {
    pub post_id: Uuid,
    pub groups: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_decodes_camel_case() {
        let post: Post = serde_json::from_value(json!({
            "id": "6f1c2a52-8d52-4b8e-9a4f-0d2d3e7c1a10",
            "userId": "0b6d1c1e-2f4a-4f55-8f4e-3c1b2a9d8e70",
            "media": "LINK",
            "dateCreated": "2025-03-01T12:00:00.123456Z",
        }))
        .unwrap();

        assert_eq!(post.media, Media::Link);
        assert!(post.caption.is_none());
        assert_eq!(post.date_created.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_unknown_media_is_other() {
        let media: Media = serde_json::from_value(json!("GIF")).unwrap();
        assert_eq!(media, Media::Other);
        assert_eq!(serde_json::to_value(Media::Other).unwrap(), json!("OTHER"));
    }

    #[test]
    fn test_post_request_encoding() {
        let group = Uuid::nil();
        let request = PostRequest::new(Media::Text, vec![group]).with_caption("hello");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"media": "TEXT", "caption": "hello", "groups": [group]})
        );
    }

    #[test]
    fn test_media_from_str() {
        assert_eq!("video".parse::<Media>().unwrap(), Media::Video);
        assert!("gif".parse::<Media>().is_err());
    }
}
