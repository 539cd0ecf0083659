//! Key-value store abstraction
//!
//! This module defines the small set of primitive commands the rest of the crate
//! needs from an external store (SET, GET, INCR, RPUSH, LRANGE, SETEX, FLUSHDB,
//! DEL) and provides two backends: `RedisStore` for a real server and
//! `MemoryStore` for in-process use and tests.

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::{RedisStore, StoreConfig, DEFAULT_REDIS_URL};

/// Errors returned by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis client or server reported an error
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A list or counter command was issued against a key holding another kind of value
    #[error("Operation against a key holding the wrong kind of value: {key}")]
    WrongType { key: String },

    /// INCR was issued against, or a counter read from, a value that is not an integer
    #[error("Value is not an integer or out of range: {key}")]
    NotAnInteger { key: String },

    /// The TTL given to `set_ex` is zero or too large to represent
    #[error("Invalid expire time for key: {key}")]
    InvalidExpire { key: String },
}

/// Parses a counter value as written by INCR
pub fn parse_counter(key: &str, raw: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| StoreError::NotAnInteger {
            key: key.to_string(),
        })
}

/// Reads the counter under `key`, 0 if it was never incremented
pub async fn read_counter<S>(store: &S, key: &str) -> Result<i64, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    match store.get(key).await? {
        Some(raw) => parse_counter(key, &raw),
        None => Ok(0),
    }
}

/// The primitive commands of an external key-value store
///
/// Every method is a single round-trip. Atomicity of `incr` is the backend's
/// responsibility; nothing above this trait adds locking.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes `value` under `key`, replacing any previous value and clearing its TTL
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Writes `value` under `key` with a time-to-live
    ///
    /// A zero TTL is rejected with `StoreError::InvalidExpire`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Reads the value under `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Increments the integer under `key` by one, starting from 0, and returns the new value
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Appends `value` to the list under `key` and returns the new length
    async fn rpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError>;

    /// Returns list elements between `start` and `stop` inclusive
    ///
    /// Negative indices count from the end, so `lrange(key, 0, -1)` is the whole list.
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Removes `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Removes every key in the current database
    async fn flush_db(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter_accepts_decimal() {
        assert_eq!(parse_counter("n", b"42").unwrap(), 42);
        assert_eq!(parse_counter("n", b"-1").unwrap(), -1);
    }

    #[test]
    fn test_parse_counter_rejects_text_and_invalid_utf8() {
        assert!(matches!(
            parse_counter("n", b"abc"),
            Err(StoreError::NotAnInteger { ref key }) if key == "n"
        ));
        assert!(parse_counter("n", &[0xff]).is_err());
        assert!(parse_counter("n", b" 1").is_err());
    }

    #[tokio::test]
    async fn test_read_counter_missing_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(read_counter(&store, "n").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_counter_corrupt_is_error() {
        let store = MemoryStore::new();
        store.set("n", b"abc").await.unwrap();
        assert!(matches!(
            read_counter(&store, "n").await,
            Err(StoreError::NotAnInteger { .. })
        ));
    }
}
