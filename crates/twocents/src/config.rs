use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::cache::CacheConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.twocentsapp.com/v1/";

const DEFAULT_USER_AGENT: &str = concat!("twocents-client/", env!("CARGO_PKG_VERSION"));

/// Configurable options for the API client and media cache
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the REST API, e.g. `https://api.twocentsapp.com/v1/`
    pub base_url: String,

    /// Media cache configuration
    pub cache_config: CacheConfig,

    /// Overall timeout for a request; zero leaves the HTTP stack default
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Extra headers sent with every request
    pub headers: HeaderMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            cache_config: CacheConfig::default(),
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ClientConfig::get_default_headers(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> crate::builder::ClientConfigBuilder {
        crate::builder::ClientConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}
