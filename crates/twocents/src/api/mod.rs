//! # API client
//!
//! Typed calls for the `post/*`, `user/*` and `group/*` endpoints, all sent
//! through the authenticated [`Request`] envelope. Feed-style GETs are
//! conditional: the server tags them with an `ETag` and the last body is
//! reused when it answers `304`.

mod group;
mod post;
mod response_cache;
mod user;

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;
use url::Url;

pub use response_cache::{DEFAULT_RESPONSE_CACHE_CAPACITY, ResponseCache};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::multipart::MultipartForm;
use crate::request::{ContentType, Payload, Request, classify, decode_json};
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    response_cache: Arc<ResponseCache>,
}

impl ApiClient {
    /// Client over a reqwest transport built from `config`
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::from_config(config)?);
        Self::with_transport(&config.base_url, transport, tokens)
    }

    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            transport,
            tokens,
            response_cache: Arc::new(ResponseCache::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The transport, for sharing with a [`MediaCacheManager`](crate::MediaCacheManager)
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.response_cache
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ApiError::from)
    }

    pub(crate) fn endpoint_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    pub(crate) async fn send<T>(&self, request: &Request<T>) -> Result<Payload>
    where
        T: Serialize + Send + Sync,
    {
        request.send(self.transport.as_ref(), self.tokens.as_ref()).await
    }

    pub(crate) async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        let body = self.send(&Request::get(url)).await?.require_body()?;
        decode_json(&body)
    }

    pub(crate) async fn post_json<B, R>(&self, path: &str, body: B) -> Result<R>
    where
        B: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let bytes = self.post(path, body).await?;
        decode_json(&bytes)
    }

    /// POST a JSON body, returning the raw response body
    pub(crate) async fn post<B>(&self, path: &str, body: B) -> Result<Bytes>
    where
        B: Serialize + Send + Sync,
    {
        let request = Request::new(Method::POST, ContentType::Json, self.endpoint(path)?)
            .with_body(body);
        self.send(&request).await?.require_body()
    }

    pub(crate) async fn post_multipart(&self, path: &str, form: &MultipartForm) -> Result<Bytes> {
        let encoded = form.encode()?;
        let request = Request::<()>::new(Method::POST, encoded.content_type(), self.endpoint(path)?)
            .with_bytes(encoded.body);
        self.send(&request).await?.require_body()
    }

    /// GET with `If-None-Match` from the response cache; a `304` returns the
    /// cached body.
    pub(crate) async fn get_conditional(&self, url: Url) -> Result<Bytes> {
        let key = url.to_string();
        let cached = self.response_cache.get(&key);

        let mut request = Request::get(url);
        if let Some(cached) = &cached {
            request = request.with_header(IF_NONE_MATCH.as_str(), cached.etag.as_str());
        }

        let response = request
            .execute(self.transport.as_ref(), self.tokens.as_ref())
            .await?;
        let etag = response.header(ETAG.as_str()).map(str::to_owned);

        match classify(response)? {
            Payload::Body(body) => {
                match etag {
                    Some(etag) => self.response_cache.put(key, etag, body.clone()),
                    None => self.response_cache.remove(&key),
                }
                Ok(body)
            }
            Payload::NotModified => {
                trace!(url = %key, "Reusing cached response");
                cached.map(|c| c.body).ok_or(ApiError::NoData)
            }
        }
    }
}
