//! Tiered store adapter.
//!
//! One `TierStore` per cacheable tier: a TTL, a shared backend and the shared
//! statistics aggregator. Values are stored as JSON.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::backend::{BackendError, KvBackend};
use super::keys::CacheKey;
use super::stats::{CacheStats, TierStats};
use super::tier::Tier;

const METRIC_CACHE_BACKEND_ERROR: &str = "techtrend_cache_backend_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("cached payload could not be (de)serialized: {0}")]
    Codec(#[from] serde_json::Error),
}

pub struct TierStore {
    tier: Tier,
    ttl: Duration,
    backend: Arc<dyn KvBackend>,
    stats: Arc<CacheStats>,
}

impl TierStore {
    pub fn new(
        tier: Tier,
        ttl: Duration,
        backend: Arc<dyn KvBackend>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            tier,
            ttl,
            backend,
            stats,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Look up `key`, recording a hit or a miss.
    ///
    /// Anything short of a decodable value counts as a miss, including a
    /// backend failure, which is also returned to the caller.
    pub async fn get<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>, CacheError> {
        let raw = match self.backend.get(key.as_str()).await {
            Ok(raw) => raw,
            Err(err) => {
                self.stats.record_miss(self.tier);
                counter!(METRIC_CACHE_BACKEND_ERROR, "tier" => self.tier.label()).increment(1);
                return Err(err.into());
            }
        };

        let Some(raw) = raw else {
            debug!(tier = %self.tier, key = %key, outcome = "miss", "cache lookup");
            self.stats.record_miss(self.tier);
            return Ok(None);
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                debug!(tier = %self.tier, key = %key, outcome = "hit", "cache lookup");
                self.stats.record_hit(self.tier);
                Ok(Some(value))
            }
            Err(err) => {
                self.stats.record_miss(self.tier);
                Err(err.into())
            }
        }
    }

    /// Store `value` under `key` with this tier's TTL, overwriting silently.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &CacheKey, value: &V) -> Result<(), CacheError> {
        let payload = Bytes::from(serde_json::to_vec(value)?);
        if let Err(err) = self.backend.set(key.as_str(), payload, self.ttl).await {
            counter!(METRIC_CACHE_BACKEND_ERROR, "tier" => self.tier.label()).increment(1);
            return Err(err.into());
        }
        self.stats.record_set(self.tier);
        Ok(())
    }

    /// Read-through lookup.
    ///
    /// A hit returns without calling `compute`. On a miss the computed value is
    /// stored and returned. A failed `compute` propagates untouched and leaves
    /// the key empty. When the backend is unreachable the value is computed and
    /// returned without touching the backend again.
    pub async fn get_or_populate<V, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match self.get::<V>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(CacheError::Backend(err)) => {
                warn!(
                    tier = %self.tier,
                    key = %key,
                    backend = self.backend.name(),
                    error = %err,
                    result = "fallback_compute",
                    "cache backend unavailable"
                );
                return compute().await;
            }
            Err(CacheError::Codec(err)) => {
                warn!(
                    tier = %self.tier,
                    key = %key,
                    error = %err,
                    result = "recompute",
                    "discarding undecodable cache entry"
                );
            }
        }

        let value = compute().await?;

        if let Err(err) = self.set(key, &value).await {
            warn!(
                tier = %self.tier,
                key = %key,
                backend = self.backend.name(),
                error = %err,
                result = "not_cached",
                "failed to populate cache entry"
            );
        }

        Ok(value)
    }

    pub fn stats(&self) -> TierStats {
        self.stats.get(self.tier)
    }

    pub fn reset_stats(&self) {
        self.stats.reset(self.tier);
    }
}
