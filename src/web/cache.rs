//! Access-tracking page cache
//!
//! Every `get_page` increments `count:<url>`. Bodies are kept under
//! `cache:<url>` with a store-enforced TTL; this module never evicts anything
//! itself.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::fetch::{FetchError, PageFetcher};
use crate::store::{read_counter, KeyValueStore, StoreError};

/// How long a fetched page stays cached by default
pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(10);

/// Errors returned by `WebCache`
#[derive(Debug, Error)]
pub enum WebCacheError {
    /// The underlying store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Fetching the page failed; nothing was cached
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The cached body is not valid UTF-8
    #[error("Cached page is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Configuration for the page cache
#[derive(Debug, Clone)]
pub struct WebCacheConfig {
    /// How long a fetched page is served from the cache
    pub ttl: Duration,
}

impl Default for WebCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_PAGE_TTL,
        }
    }
}

/// Store key of the access counter for `url`
pub fn count_key(url: &str) -> String {
    format!("count:{url}")
}

/// Store key of the cached body for `url`
pub fn cache_key(url: &str) -> String {
    format!("cache:{url}")
}

/// Wraps a `PageFetcher` with access counting and a short expiring cache
pub struct WebCache<F> {
    store: Arc<dyn KeyValueStore>,
    fetcher: F,
    config: WebCacheConfig,
}

impl<F: PageFetcher> WebCache<F> {
    /// Creates a page cache with the default 10 second TTL
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: F) -> Self {
        Self::with_config(store, fetcher, WebCacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, fetcher: F, config: WebCacheConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Returns the body of `url`, from the cache when present
    ///
    /// The access counter is incremented before anything else, so it counts hits,
    /// misses and failed fetches alike. On a miss the fetched body is cached with
    /// the configured TTL. Fetch errors propagate and leave no cache entry.
    pub async fn get_page(&self, url: &str) -> Result<String, WebCacheError> {
        let accesses = self.store.incr(&count_key(url)).await?;

        let key = cache_key(url);
        if let Some(cached) = self.store.get(&key).await? {
            log::info!("Cache hit for {} (access #{})", url, accesses);
            return Ok(String::from_utf8(cached)?);
        }

        log::info!("Cache miss for {} (access #{})", url, accesses);
        let content = self.fetcher.fetch(url).await?;
        self.store
            .set_ex(&key, content.as_bytes(), self.config.ttl)
            .await?;
        Ok(content)
    }

    /// Number of times `url` has been requested, 0 if never
    ///
    /// A counter holding anything but an integer is `StoreError::NotAnInteger`.
    pub async fn access_count(&self, url: &str) -> Result<i64, WebCacheError> {
        Ok(read_counter(self.store.as_ref(), &count_key(url)).await?)
    }
}
