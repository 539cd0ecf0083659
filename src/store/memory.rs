//! In-process store
//!
//! Mirrors the observable semantics of the Redis commands used by this crate:
//! expiring keys, integer counters stored as decimal text, and lists. Expired
//! entries are dropped lazily when touched.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{parse_counter, KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A store living entirely in process memory
///
/// Uses tokio's clock, so TTLs follow `tokio::time::pause`/`advance` in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the store holds no live keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the live entry for `key`, evicting it first if it has expired
    fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if map.get(key).is_some_and(|e| e.is_expired(now)) {
            map.remove(key);
        }
        map.get_mut(key)
    }
}

/// Resolves Redis-style inclusive, possibly negative, bounds against `len`
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock()
            .insert(key.to_string(), Entry::persistent(Value::Bytes(value.to_vec())));
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Some(ttl)
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| Instant::now().checked_add(ttl))
            .ok_or_else(|| StoreError::InvalidExpire {
                key: key.to_string(),
            })?;
        let entry = Entry {
            value: Value::Bytes(value.to_vec()),
            expires_at: Some(expires_at),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut map = self.lock();
        match Self::live(&mut map, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut map = self.lock();
        let current = match Self::live(&mut map, key) {
            None => 0,
            Some(Entry {
                value: Value::Bytes(bytes),
                ..
            }) => parse_counter(key, bytes)?,
            Some(_) => {
                return Err(StoreError::WrongType {
                    key: key.to_string(),
                })
            }
        };
        let next = current.checked_add(1).ok_or_else(|| StoreError::NotAnInteger {
            key: key.to_string(),
        })?;

        // INCR keeps an existing TTL, so only the value is replaced.
        let bytes = next.to_string().into_bytes();
        match Self::live(&mut map, key) {
            Some(entry) => entry.value = Value::Bytes(bytes),
            None => {
                map.insert(key.to_string(), Entry::persistent(Value::Bytes(bytes)));
            }
        }
        Ok(next)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let mut map = self.lock();
        if Self::live(&mut map, key).is_none() {
            map.insert(key.to_string(), Entry::persistent(Value::List(VecDeque::new())));
        }
        match Self::live(&mut map, key).map(|e| &mut e.value) {
            Some(Value::List(list)) => {
                list.push_back(value.to_vec());
                Ok(list.len())
            }
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut map = self.lock();
        match Self::live(&mut map, key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(Value::Bytes(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut map = self.lock();
        let existed = Self::live(&mut map, key).is_some();
        map.remove(key);
        Ok(existed)
    }

    async fn flush_db(&self) -> Result<(), StoreError> {
        self.lock().clear();
        log::debug!("Flushed in-memory store");
        Ok(())
    }
}
