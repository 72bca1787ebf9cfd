//! # Request envelope
//!
//! Turns a [`Request`] descriptor into an authenticated [`HttpRequest`] and
//! classifies the response. A `304 Not Modified` is not an error here: it is
//! returned as [`Payload::NotModified`] so callers holding cached state can
//! reuse it.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::TokenProvider;
use crate::error::{ApiError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Content types the API deals in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    TextPlain,
    ImageJpeg,
    VideoMp4,
    /// `multipart/form-data` with the given boundary
    Multipart(String),
    Custom(String),
}

impl ContentType {
    pub fn header_value(&self) -> Cow<'_, str> {
        match self {
            ContentType::Json => Cow::Borrowed("application/json"),
            ContentType::TextPlain => Cow::Borrowed("text/plain"),
            ContentType::ImageJpeg => Cow::Borrowed("image/jpeg"),
            ContentType::VideoMp4 => Cow::Borrowed("video/mp4"),
            ContentType::Multipart(boundary) => {
                Cow::Owned(format!("multipart/form-data; boundary={boundary}"))
            }
            ContentType::Custom(value) => Cow::Borrowed(value),
        }
    }
}

/// Classified response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Body(Bytes),
    NotModified,
}

impl Payload {
    pub fn into_body(self) -> Option<Bytes> {
        match self {
            Payload::Body(bytes) => Some(bytes),
            Payload::NotModified => None,
        }
    }

    /// The body, treating a bare 304 as missing data.
    pub fn require_body(self) -> Result<Bytes> {
        self.into_body().ok_or(ApiError::NoData)
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, Payload::NotModified)
    }
}

/// Maps a raw response onto the success / error kinds of the API.
pub fn classify(response: HttpResponse) -> Result<Payload> {
    match response.status {
        StatusCode::NOT_MODIFIED => Ok(Payload::NotModified),
        StatusCode::OK if response.body.is_empty() => Err(ApiError::NoData),
        StatusCode::OK => Ok(Payload::Body(response.body)),
        status => {
            debug!(
                status = %status,
                body = %String::from_utf8_lossy(&response.body),
                "Unexpected response status"
            );
            Err(ApiError::UnexpectedStatus(status))
        }
    }
}

/// Decodes a JSON response body
pub fn decode_json<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(ApiError::from)
}

/// Immutable description of one API call
#[derive(Debug, Clone)]
pub struct Request<T = ()> {
    method: Method,
    content_type: ContentType,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<T>,
    raw_body: Option<Bytes>,
}

impl Request<()> {
    /// A GET carrying no body
    pub fn get(url: Url) -> Self {
        Request::new(Method::GET, ContentType::Json, url)
    }
}

impl<T> Request<T>
where
    T: Serialize + Send + Sync,
{
    pub fn new(method: Method, content_type: ContentType, url: Url) -> Self {
        Self {
            method,
            content_type,
            url,
            headers: Vec::new(),
            body: None,
            raw_body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Body serialized as JSON when the request is sent
    pub fn with_body(mut self, body: T) -> Self {
        self.body = Some(body);
        self
    }

    /// Pre-encoded body, sent as-is; takes precedence over a JSON body
    pub fn with_bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.raw_body = Some(bytes.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Builds the outgoing request. Fails without touching the network when no
    /// session exists.
    pub async fn build(&self, tokens: &dyn TokenProvider) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(self.method.clone(), self.url.clone());

        let content_type = HeaderValue::from_str(&self.content_type.header_value())
            .map_err(|e| ApiError::InvalidHeader(format!("content-type: {e}")))?;
        request.headers.insert(CONTENT_TYPE, content_type);

        let token = tokens.bearer_token().await?;
        let authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::InvalidHeader(format!("authorization: {e}")))?;
        request.headers.insert(AUTHORIZATION, authorization);

        for (name, value) in &self.headers {
            request.set_header(name, value)?;
        }

        if self.method != Method::GET {
            request.body = match (&self.raw_body, &self.body) {
                (Some(raw), _) => Some(raw.clone()),
                (None, Some(body)) => Some(Bytes::from(serde_json::to_vec(body)?)),
                (None, None) => None,
            };
        }

        Ok(request)
    }

    /// Sends the request and returns the raw response
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        tokens: &dyn TokenProvider,
    ) -> Result<HttpResponse> {
        let request = self.build(tokens).await?;
        debug!(method = %self.method, url = %self.url, "API request");
        transport.execute(request).await
    }

    /// Sends the request and classifies the response
    pub async fn send(
        &self,
        transport: &dyn Transport,
        tokens: &dyn TokenProvider,
    ) -> Result<Payload> {
        classify(self.execute(transport, tokens).await?)
    }
}
