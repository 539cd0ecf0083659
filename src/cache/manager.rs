//! Cache handle over a key-value store
//!
//! Provides `Cache`, which stores `StoredValue`s under random UUID keys and reads
//! them back as raw bytes or converted types.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::instrument::{CountCalls, Operation, RecordHistory};
use super::value::{self, ConversionError, StoredValue};
use super::CacheError;
use crate::store::KeyValueStore;

/// Qualified identifier of the store operation, used for its counter and history keys
pub const STORE_OPERATION: &str = "Cache.store";

/// The bare store operation: write a value under a fresh UUID key and return the key
pub struct StoreValue {
    store: Arc<dyn KeyValueStore>,
}

impl StoreValue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation<StoredValue, String> for StoreValue {
    fn name(&self) -> &str {
        STORE_OPERATION
    }

    async fn invoke(&self, data: StoredValue) -> Result<String, CacheError> {
        let key = Uuid::new_v4().to_string();
        self.store.set(&key, &data.to_bytes()).await?;
        log::debug!("Stored {} under {}", data, key);
        Ok(key)
    }
}

/// Stores typed values under random keys
///
/// The cache does not own the store's lifecycle: constructing one never clears
/// existing data. Call `flush` to start from an empty database.
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    store_op: Box<dyn Operation<StoredValue, String>>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("store_op", &self.store_op.name())
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Creates a cache whose `store` calls are counted and recorded
    ///
    /// Composition order is fixed: counting wraps history recording, which wraps
    /// the write. A call therefore increments `Cache.store`, appends to
    /// `Cache.store:inputs`, writes the value, then appends to `Cache.store:outputs`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let op = CountCalls::new(
            RecordHistory::new(StoreValue::new(store.clone()), store.clone()),
            store.clone(),
        );
        Self::with_operation(store, Box::new(op))
    }

    /// Creates a cache that writes values without any bookkeeping
    pub fn uninstrumented(store: Arc<dyn KeyValueStore>) -> Self {
        let op = StoreValue::new(store.clone());
        Self::with_operation(store, Box::new(op))
    }

    /// Creates a cache around a custom store operation, e.g. a different wrapper stack
    pub fn with_operation(
        store: Arc<dyn KeyValueStore>,
        store_op: Box<dyn Operation<StoredValue, String>>,
    ) -> Self {
        Self { store, store_op }
    }

    /// Removes every key from the underlying store database
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.store.flush_db().await?;
        Ok(())
    }

    /// Stores `data` under a fresh UUID key and returns the key
    ///
    /// # Arguments
    /// * `data` - Text, bytes, an integer or a float
    ///
    /// # Returns
    /// * `Ok(String)` - The 36-character key
    /// * `Err(CacheError)` - If the store rejects the write
    pub async fn store(&self, data: impl Into<StoredValue>) -> Result<String, CacheError> {
        self.store_op.invoke(data.into()).await
    }

    /// Reads the raw bytes stored under `key`
    ///
    /// Returns `Ok(None)` for a key that was never stored or has been flushed.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.store.get(key).await?)
    }

    /// Reads the value under `key` and converts it with `convert`
    ///
    /// Absent keys yield `Ok(None)` without calling `convert`. Conversion errors are
    /// returned as `CacheError::Conversion`.
    pub async fn get_with<T, F>(&self, key: &str, convert: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce(Vec<u8>) -> Result<T, ConversionError>,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(convert(raw)?)),
            None => Ok(None),
        }
    }

    /// Reads the value under `key` as UTF-8 text
    pub async fn get_str(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get_with(key, value::to_text).await
    }

    /// Reads the value under `key` as a decimal integer
    pub async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.get_with(key, value::to_int).await
    }

    /// Reads the value under `key` as a floating-point number
    pub async fn get_float(&self, key: &str) -> Result<Option<f64>, CacheError> {
        self.get_with(key, value::to_float).await
    }
}
