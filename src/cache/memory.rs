//! In-process backend.
//!
//! LRU-bounded map with per-entry expiry measured on the tokio clock, so
//! paused-time tests can step past a TTL.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::time::Instant;

use super::backend::{BackendError, KvBackend, compile_pattern};
use super::lock::mutex_lock;

const SOURCE: &str = "cache::memory";

struct Entry {
    value: Bytes,
    expires_at: Instant,
}

pub struct MemoryBackend {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including ones that expired but were not yet read.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        mutex_lock(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, BackendError> {
        let pattern = compile_pattern(pattern)?;
        let mut entries = mutex_lock(&self.entries, SOURCE, "delete_pattern");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        Ok(matching.len() as u64)
    }
}
