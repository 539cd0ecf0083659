//! Web page fetching with access tracking and a short-lived cache

pub mod cache;
pub mod fetch;

pub use cache::{cache_key, count_key, WebCache, WebCacheConfig, WebCacheError, DEFAULT_PAGE_TTL};
pub use fetch::{FetchError, HttpFetcher, PageFetcher};
