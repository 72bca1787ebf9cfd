//! # Builder for ClientConfig
//!
//! Fluent construction of [`ClientConfig`] values.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use twocents_client::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .with_base_url("https://staging.twocentsapp.com/v1/")
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_user_agent("TwoCentsWidget/1.0")
//!     .with_max_cache_size(64 * 1024 * 1024)
//!     .build();
//!
//! assert_eq!(config.user_agent, "TwoCentsWidget/1.0");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::{CacheConfig, ClientConfig};

/// Builder for creating ClientConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the API root. A trailing slash is added when missing so that
    /// relative endpoints join underneath it.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.config.base_url = base_url;
        self
    }

    /// Replace the whole cache configuration
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.config.cache_config = cache_config;
        self
    }

    /// Set the directory that holds cached media
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_config.cache_dir = Some(dir.into());
        self
    }

    /// Set the maximum total size of cached media in bytes
    pub fn with_max_cache_size(mut self, bytes: u64) -> Self {
        self.config.cache_config.max_size_bytes = bytes;
        self
    }

    /// Set the age after which cached media is evicted
    pub fn with_max_cache_age(mut self, age: Duration) -> Self {
        self.config.cache_config.max_age = Some(age);
        self
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set how long idle pooled connections are kept
    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header; invalid names or values are ignored
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Build the final ClientConfig
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
