//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{ApiError, Result};
use crate::link::{LinkMetadata, LinkMetadataProvider};
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: Bytes::copy_from_slice(body),
    }
}

enum Reply {
    Response(HttpResponse),
    Failure(String),
    /// Answered to every request and never consumed
    Repeat(HttpResponse),
}

/// Transport answering from per-URL queues and recording every request.
/// A URL with an empty queue fails like an unreachable host.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.push(url, Reply::Response(response));
    }

    pub fn respond_always(&self, url: &str, response: HttpResponse) {
        self.push(url, Reply::Repeat(response));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.push(url, Reply::Failure(message.to_owned()));
    }

    fn push(&self, url: &str, reply: Reply) {
        let url = Url::parse(url).unwrap().to_string();
        self.replies.lock().entry(url).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.to_string();
        self.requests.lock().push(request);

        let reply = {
            let mut replies = self.replies.lock();
            let queue = replies.get_mut(&url);
            match queue {
                Some(queue) => match queue.front() {
                    Some(Reply::Repeat(response)) => Some(Reply::Repeat(response.clone())),
                    _ => queue.pop_front(),
                },
                None => None,
            }
        };
        match reply {
            Some(Reply::Response(response) | Reply::Repeat(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(ApiError::InvalidResponse(message)),
            None => Err(ApiError::InvalidResponse(format!("no scripted reply for {url}"))),
        }
    }
}

/// Link provider returning a fixed title and counting calls
#[derive(Default)]
pub struct FakeLinkProvider {
    pub calls: Mutex<usize>,
    pub fail: AtomicBool,
}

impl FakeLinkProvider {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LinkMetadataProvider for FakeLinkProvider {
    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata> {
        *self.calls.lock() += 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::UnexpectedStatus(StatusCode::BAD_GATEWAY));
        }
        Ok(LinkMetadata {
            title: Some(format!("Title of {}", url.path())),
            ..LinkMetadata::new(url.as_str())
        })
    }
}
