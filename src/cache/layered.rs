//! Layered cache orchestrator.
//!
//! Normalizes a request, classifies it, derives the tier key and dispatches to
//! that tier's store. Holds no domain state of its own beyond the three stores.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::backend::{KvBackend, glob_escape};
use super::config::CacheConfig;
use super::keys::{CacheKey, build_key};
use super::params::{NormalizedParams, QueryParams};
use super::rules::{PUBLIC_PREFIX, SEARCH_PREFIX, user_prefix};
use super::stats::{AggregateStats, CacheStats};
use super::store::{CacheError, TierStore};
use super::tier::{Tier, classify};

const METRIC_CACHE_INVALIDATED: &str = "techtrend_cache_invalidated_total";
const ALL_USERS_PATTERN: &str = "user:*:articles:*";

/// How a request is routed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub params: NormalizedParams,
    pub tier: Tier,
    pub key: Option<CacheKey>,
}

/// Normalize, classify and key a request without touching any backend.
pub fn resolve(params: &QueryParams) -> Resolution {
    let params = params.normalize();
    let tier = classify(&params);
    let key = build_key(tier, &params);
    Resolution { params, tier, key }
}

pub struct LayeredCache {
    config: CacheConfig,
    public: TierStore,
    user_scoped: TierStore,
    search: TierStore,
    stats: Arc<CacheStats>,
    backend: Arc<dyn KvBackend>,
}

impl LayeredCache {
    pub fn new(config: CacheConfig, backend: Arc<dyn KvBackend>) -> Self {
        let stats = Arc::new(CacheStats::new());
        let store = |tier: Tier| {
            TierStore::new(
                tier,
                config.ttl_for(tier),
                Arc::clone(&backend),
                Arc::clone(&stats),
            )
        };

        Self {
            public: store(Tier::Public),
            user_scoped: store(Tier::UserScoped),
            search: store(Tier::Search),
            config,
            stats,
            backend,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn tier_store(&self, tier: Tier) -> Option<&TierStore> {
        match tier {
            Tier::Public => Some(&self.public),
            Tier::UserScoped => Some(&self.user_scoped),
            Tier::Search => Some(&self.search),
            Tier::Uncacheable => None,
        }
    }

    fn route(&self, params: &QueryParams) -> Option<(&TierStore, CacheKey)> {
        if !self.config.enabled {
            return None;
        }
        let Resolution { tier, key, .. } = resolve(params);
        let store = self.tier_store(tier)?;
        let key = key?;
        Some((store, key))
    }

    /// Serve `params` from its tier, computing and caching on a miss.
    ///
    /// Uncacheable requests (and every request while the cache is disabled)
    /// run `compute` directly. Errors from `compute` are returned untouched.
    pub async fn fetch<V, E, F, Fut>(&self, params: &QueryParams, compute: F) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match self.route(params) {
            Some((store, key)) => store.get_or_populate(&key, compute).await,
            None => {
                debug!(outcome = "bypass", "request not cacheable");
                compute().await
            }
        }
    }

    /// Cached value for `params`, if any.
    ///
    /// Backend and decode failures are logged and reported as not found.
    pub async fn lookup<V: DeserializeOwned>(&self, params: &QueryParams) -> Option<V> {
        let (store, key) = self.route(params)?;
        match store.get(&key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    tier = %store.tier(),
                    key = %key,
                    error = %err,
                    result = "not_found",
                    "cache lookup failed"
                );
                None
            }
        }
    }

    /// Store `value` for `params`; a no-op for uncacheable requests.
    pub async fn store<V: Serialize + ?Sized>(
        &self,
        params: &QueryParams,
        value: &V,
    ) -> Result<(), CacheError> {
        match self.route(params) {
            Some((store, key)) => store.set(&key, value).await,
            None => Ok(()),
        }
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        self.stats.aggregate()
    }

    pub fn reset_all_stats(&self) {
        self.stats.reset_all();
    }

    /// Drop every cached article listing: public, search and all users'.
    ///
    /// Called when an article is created, updated or deleted.
    pub async fn invalidate_articles(&self) -> u64 {
        let patterns = [
            format!("{PUBLIC_PREFIX}*"),
            format!("{SEARCH_PREFIX}*"),
            ALL_USERS_PATTERN.to_string(),
        ];

        let mut removed = 0;
        for pattern in &patterns {
            removed += self.delete_pattern("articles", pattern).await;
        }
        removed
    }

    /// Drop one user's read-state listings.
    pub async fn invalidate_user(&self, user_id: &str) -> u64 {
        let pattern = format!("{}*", user_prefix(&glob_escape(user_id)));
        self.delete_pattern("user", &pattern).await
    }

    async fn delete_pattern(&self, scope: &'static str, pattern: &str) -> u64 {
        if !self.config.enabled {
            return 0;
        }

        match self.backend.delete_pattern(pattern).await {
            Ok(removed) => {
                info!(scope, pattern, removed, "cache entries invalidated");
                counter!(METRIC_CACHE_INVALIDATED, "scope" => scope).increment(removed);
                removed
            }
            Err(err) => {
                warn!(
                    scope,
                    pattern,
                    backend = self.backend.name(),
                    error = %err,
                    result = "skipped",
                    "cache invalidation failed"
                );
                0
            }
        }
    }
}
