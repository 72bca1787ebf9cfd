//! # Link previews
//!
//! Preview metadata for shared links. [`HtmlMetadataProvider`] reads Open Graph
//! tags and falls back to `<title>` and `<meta name="description">`.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::request::classify;
use crate::transport::{HttpRequest, Transport};

static META_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl LinkMetadata {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Fetches preview metadata for a page
#[async_trait]
pub trait LinkMetadataProvider: Send + Sync {
    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata>;
}

/// Downloads the page and extracts metadata from its HTML
#[derive(Clone)]
pub struct HtmlMetadataProvider {
    transport: Arc<dyn Transport>,
}

impl HtmlMetadataProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LinkMetadataProvider for HtmlMetadataProvider {
    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata> {
        let mut request = HttpRequest::get(url.clone());
        request.set_header("accept", "text/html,application/xhtml+xml")?;

        let body = classify(self.transport.execute(request).await?)?.require_body()?;
        let html = String::from_utf8_lossy(&body);
        let metadata = parse_html(url, &html);

        debug!(url = %url, title = ?metadata.title, "Extracted link metadata");
        Ok(metadata)
    }
}

/// Extracts preview metadata from an HTML document
pub fn parse_html(page: &Url, html: &str) -> LinkMetadata {
    let mut metadata = LinkMetadata::new(page.as_str());
    let mut fallback_description = None;

    for tag in META_TAG_REGEX.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTRIBUTE_REGEX.captures_iter(tag.as_str()) {
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" => key = value.map(str::to_ascii_lowercase),
                "content" => content = value.map(decode_entities),
                _ => {}
            }
        }

        let (Some(key), Some(content)) = (key, content) else {
            continue;
        };
        if content.trim().is_empty() {
            continue;
        }

        match key.as_str() {
            "og:title" => metadata.title = Some(content),
            "og:description" => metadata.description = Some(content),
            "og:image" | "og:image:url" if metadata.image_url.is_none() => {
                metadata.image_url = page.join(content.trim()).ok().map(String::from);
            }
            "og:site_name" => metadata.site_name = Some(content),
            "og:url" => {
                if let Ok(canonical) = page.join(content.trim()) {
                    metadata.url = canonical.into();
                }
            }
            "description" => fallback_description = Some(content),
            _ => {}
        }
    }

    if metadata.title.is_none() {
        metadata.title = TITLE_REGEX
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty());
    }
    if metadata.description.is_none() {
        metadata.description = fallback_description;
    }

    metadata
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, response};

    const PAGE: &str = r#"<!doctype html>
<html><head>
  <title>Fallback &amp; title</title>
  <meta property="og:title" content="Rust &amp; You">
  <meta name="description" content="Plain description">
  <meta content='/img/cover.png' property='og:image'>
  <meta property="og:site_name" content="Example">
</head><body></body></html>"#;

    #[test]
    fn test_open_graph_tags_win() {
        let page = Url::parse("https://example.com/posts/1").unwrap();
        let metadata = parse_html(&page, PAGE);
        assert_eq!(metadata.title.as_deref(), Some("Rust & You"));
        assert_eq!(metadata.description.as_deref(), Some("Plain description"));
        assert_eq!(metadata.image_url.as_deref(), Some("https://example.com/img/cover.png"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example"));
        assert_eq!(metadata.url, "https://example.com/posts/1");
    }

    #[test]
    fn test_title_fallback() {
        let page = Url::parse("https://example.com/").unwrap();
        let metadata = parse_html(&page, "<html><title> Hello &lt;world&gt; </title></html>");
        assert_eq!(metadata.title.as_deref(), Some("Hello <world>"));
        assert!(metadata.image_url.is_none());
    }

    #[tokio::test]
    async fn test_provider_fetches_page() {
        let transport = ScriptedTransport::new();
        transport.respond("https://example.com/a", response(200, &[], PAGE.as_bytes()));
        let provider = HtmlMetadataProvider::new(transport.clone());

        let metadata = provider
            .fetch_metadata(&Url::parse("https://example.com/a").unwrap())
            .await
            .unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Rust & You"));
        assert_eq!(transport.request_count(), 1);
    }
}
