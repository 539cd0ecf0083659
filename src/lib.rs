//! keycache library
//!
//! Typed value storage with call instrumentation, and an access-tracking web page
//! cache, both over a Redis-compatible key-value store.

pub mod cache;
pub mod cli;
pub mod store;
pub mod web;

pub use cache::{replay, Cache, CacheError, CallReplay, StoredValue};
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreConfig, StoreError};
pub use web::{HttpFetcher, PageFetcher, WebCache, WebCacheConfig};
