use bytes::Bytes;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::{
    LinkDownload, Media, MediaPayload, PaginatedPosts, Post, PostRequest, PostWithMedia,
    TextDownload,
};
use crate::multipart::MultipartForm;
use crate::request::decode_json;

impl ApiClient {
    /// Create a post; its media is uploaded separately
    pub async fn create_post(&self, request: &PostRequest) -> Result<Post> {
        self.post_json("post/create-post", request).await
    }

    /// Upload a file for `post` as a `post` JSON part plus a `file` part
    pub async fn upload_media(
        &self,
        post: &Post,
        file: Bytes,
        mime: &str,
        filename: &str,
        endpoint: &str,
    ) -> Result<Bytes> {
        debug!(post = %post.id, mime, size = file.len(), "Uploading media");
        let form = MultipartForm::new()
            .json_part("post", post)?
            .file_part("file", filename, mime, file);
        self.post_multipart(endpoint, &form).await
    }

    /// Upload the content of `post` according to its media kind. Link posts
    /// take the URL as UTF-8 bytes, text posts the text.
    pub async fn upload_media_post(&self, post: &Post, data: Bytes) -> Result<Bytes> {
        match post.media {
            Media::Image | Media::Other => {
                self.upload_media(post, data, "image/jpeg", "image.jpeg", "post/upload-image-post")
                    .await
            }
            Media::Video => {
                self.upload_media(post, data, "video/mp4", "video.mp4", "post/upload-video-post")
                    .await
            }
            Media::Link => {
                let url = String::from_utf8_lossy(&data);
                let url = Url::parse(url.trim())?;
                let field = LinkField {
                    media_url: url.as_str(),
                };
                self.upload_field(post, "link", &field, "post/upload-link-post")
                    .await
            }
            Media::Text => {
                let text = String::from_utf8_lossy(&data);
                let field = TextField {
                    text: text.as_ref(),
                };
                self.upload_field(post, "text", &field, "post/upload-text-post")
                    .await
            }
        }
    }

    pub async fn upload_link_post(&self, post: &Post, media_url: &Url) -> Result<LinkDownload> {
        let field = LinkField {
            media_url: media_url.as_str(),
        };
        let body = self
            .upload_field(post, "link", &field, "post/upload-link-post")
            .await?;
        decode_json(&body)
    }

    pub async fn upload_text_post(&self, post: &Post, text: &str) -> Result<TextDownload> {
        let body = self
            .upload_field(post, "text", &TextField { text }, "post/upload-text-post")
            .await?;
        decode_json(&body)
    }

    async fn upload_field<T: serde::Serialize + Sync>(
        &self,
        post: &Post,
        name: &str,
        value: &T,
        endpoint: &str,
    ) -> Result<Bytes> {
        let form = MultipartForm::new()
            .json_part("post", post)?
            .json_part(name, value)?;
        self.post_multipart(endpoint, &form).await
    }

    /// One page of a group feed. `offset` is the cursor returned by the
    /// previous page; `None` starts at the newest post.
    pub async fn get_group_posts(
        &self,
        group_id: Uuid,
        offset: Option<Uuid>,
    ) -> Result<PaginatedPosts> {
        let mut query = vec![("groupId", group_id.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let url = self.endpoint_with_query("post/get-group-posts", &query)?;
        let body = self.get_conditional(url).await?;
        decode_json(&body)
    }

    /// Newest post of a group
    pub async fn get_top_post(&self, group_id: Uuid) -> Result<PostWithMedia> {
        let url =
            self.endpoint_with_query("post/get-top-post", &[("groupId", group_id.to_string())])?;
        let body = self.get_conditional(url).await?;
        decode_json(&body)
    }

    /// Media records of `post`. Transport and status errors propagate; a body
    /// that does not decode yields an empty payload.
    pub async fn get_media(&self, post: &Post) -> Result<MediaPayload> {
        let url = self.endpoint_with_query(
            "post/get-media",
            &[
                ("postId", post.id.to_string()),
                ("media", post.media.as_str().to_owned()),
            ],
        )?;
        match self.get_conditional(url).await {
            Ok(body) => Ok(MediaPayload::from_slice(post.media, &body)),
            Err(ApiError::NoData) => Ok(MediaPayload::empty(post.media)),
            Err(e) => Err(e),
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkField<'a> {
    media_url: &'a str,
}

#[derive(serde::Serialize)]
struct TextField<'a> {
    text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::super::tests::{BASE, client};
    use super::*;
    use crate::test_support::{ScriptedTransport, response};
    use chrono::{TimeZone, Utc};
    use memchr::memmem;
    use serde_json::json;

    fn post(media: Media) -> Post {
        Post {
            id: Uuid::parse_str("22222222-2222-4222-8222-222222222222").unwrap(),
            user_id: Uuid::parse_str("33333333-3333-4333-8333-333333333333").unwrap(),
            media,
            date_created: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            caption: Some("hi".into()),
        }
    }

    fn contains(body: &[u8], needle: &str) -> bool {
        memmem::find(body, needle.as_bytes()).is_some()
    }

    #[tokio::test]
    async fn test_create_post_sends_json() {
        let transport = ScriptedTransport::new();
        let created = serde_json::to_vec(&post(Media::Text)).unwrap();
        transport.respond(&format!("{BASE}post/create-post"), response(200, &[], &created));
        let client = client(transport.clone());

        let group = Uuid::new_v4();
        let request = PostRequest::new(Media::Text, vec![group]).with_caption("hi");
        let post = client.create_post(&request).await.unwrap();
        assert_eq!(post.media, Media::Text);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, reqwest::Method::POST);
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("authorization"), Some("Bearer tok"));
        let body: serde_json::Value = serde_json::from_slice(&sent.body.unwrap()).unwrap();
        assert_eq!(body, json!({"media": "TEXT", "caption": "hi", "groups": [group]}));
    }

    #[tokio::test]
    async fn test_video_upload_is_multipart() {
        let transport = ScriptedTransport::new();
        transport.respond(&format!("{BASE}post/upload-video-post"), response(200, &[], b"{}"));
        let client = client(transport.clone());

        client
            .upload_media_post(&post(Media::Video), Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"))
            .await
            .unwrap();

        let sent = transport.last_request().unwrap();
        let content_type = sent.header("content-type").unwrap().to_owned();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = sent.body.unwrap();
        assert!(contains(&body, "name=\"post\""));
        assert!(contains(
            &body,
            "name=\"file\"; filename=\"video.mp4\"\r\nContent-Type: video/mp4"
        ));
        assert!(body.ends_with(format!("--{boundary}--\r\n").as_bytes()));
    }

    #[tokio::test]
    async fn test_other_media_uploads_as_image() {
        let transport = ScriptedTransport::new();
        transport.respond(&format!("{BASE}post/upload-image-post"), response(200, &[], b"{}"));
        let client = client(transport.clone());

        client
            .upload_media_post(&post(Media::Other), Bytes::from_static(b"\xFF\xD8"))
            .await
            .unwrap();
        let sent = transport.last_request().unwrap();
        assert!(contains(&sent.body.unwrap(), "Content-Type: image/jpeg"));
    }

    #[tokio::test]
    async fn test_link_upload_sends_link_field() {
        let transport = ScriptedTransport::new();
        let record = json!({
            "id": "11111111-1111-4111-8111-111111111111",
            "postId": "22222222-2222-4222-8222-222222222222",
            "mediaUrl": "https://example.com/a",
        });
        transport.respond(
            &format!("{BASE}post/upload-link-post"),
            response(200, &[], record.to_string().as_bytes()),
        );
        let client = client(transport.clone());

        let link = client
            .upload_link_post(&post(Media::Link), &Url::parse("https://example.com/a").unwrap())
            .await
            .unwrap();
        assert_eq!(link.media_url, "https://example.com/a");

        let body = transport.last_request().unwrap().body.unwrap();
        assert!(contains(
            &body,
            "name=\"link\"\r\nContent-Type: application/json\r\n\r\n{\"mediaUrl\":\"https://example.com/a\"}"
        ));
    }

    #[tokio::test]
    async fn test_invalid_link_is_rejected_before_sending() {
        let transport = ScriptedTransport::new();
        let client = client(transport.clone());

        let err = client
            .upload_media_post(&post(Media::Link), Bytes::from_static(b"not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_group_posts_query_and_cursor() {
        let transport = ScriptedTransport::new();
        let group = Uuid::parse_str("44444444-4444-4444-8444-444444444444").unwrap();
        let cursor = Uuid::parse_str("22222222-2222-4222-8222-222222222222").unwrap();
        let page = json!({
            "posts": [],
            "offset": "00000000-0000-0000-0000-000000000000",
            "hasMore": false
        });
        transport.respond(
            &format!("{BASE}post/get-group-posts?groupId={group}&offset={cursor}"),
            response(200, &[], page.to_string().as_bytes()),
        );
        let client = client(transport);

        let page = client.get_group_posts(group, Some(cursor)).await.unwrap();
        assert!(page.posts.is_empty());
        assert_eq!(page.offset, None);
    }

    #[tokio::test]
    async fn test_get_media_decodes_with_post_kind() {
        let transport = ScriptedTransport::new();
        let post = post(Media::Text);
        let records = json!([{
            "id": "11111111-1111-4111-8111-111111111111",
            "postId": post.id,
            "text": "my two cents",
        }]);
        transport.respond(
            &format!("{BASE}post/get-media?postId={}&media=TEXT", post.id),
            response(200, &[], records.to_string().as_bytes()),
        );
        let client = client(transport);

        let payload = client.get_media(&post).await.unwrap();
        assert_eq!(payload.texts()[0].text, "my two cents");
        assert!(payload.images().is_empty());
    }
}
