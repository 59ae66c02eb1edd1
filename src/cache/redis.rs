//! Redis backend.
//!
//! Shared across processes; entries expire server-side via `SET EX`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::backend::{BackendError, KvBackend};

/// Uses a `ConnectionManager`, which reconnects on its own after a dropped
/// connection. Clones share the same underlying connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    redis_url: String,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("redis_url", &self.redis_url)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(redis_url).map_err(BackendError::unavailable)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(BackendError::unavailable)?;
        info!(backend = "redis", "cache backend connected");

        Ok(Self {
            conn,
            redis_url: redis_url.to_string(),
        })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(BackendError::unavailable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError> {
        // EX rejects zero.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value.as_ref(), seconds)
            .await
            .map_err(BackendError::unavailable)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, BackendError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = {
            let mut iter = conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(BackendError::unavailable)?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&keys).await.map_err(BackendError::unavailable)?;
        debug!(backend = "redis", pattern, removed, "deleted keys by pattern");
        Ok(removed)
    }
}
