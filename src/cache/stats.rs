//! Hit/miss/set accounting per tier.
//!
//! Counters are process-local atomics; `metrics` counters are emitted alongside
//! so an installed recorder sees the same events.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde::Serialize;

use super::tier::Tier;

pub(crate) const METRIC_CACHE_HIT: &str = "techtrend_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "techtrend_cache_miss_total";
pub(crate) const METRIC_CACHE_SET: &str = "techtrend_cache_set_total";

#[derive(Debug, Default)]
struct TierCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl TierCounters {
    fn snapshot(&self) -> TierStats {
        TierStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
        )
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time counters for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub hit_rate: f64,
}

impl TierStats {
    fn new(hits: u64, misses: u64, sets: u64) -> Self {
        Self {
            hits,
            misses,
            sets,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerTierStats {
    pub public: TierStats,
    pub user_scoped: TierStats,
    pub search: TierStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_hits: u64,
    pub total_misses: u64,
    pub overall_hit_rate: f64,
}

/// The shape exposed to health and metrics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub per_tier: PerTierStats,
    pub overall: OverallStats,
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Statistics aggregator shared by every tier store.
///
/// Recording against [`Tier::Uncacheable`] is a no-op.
#[derive(Debug, Default)]
pub struct CacheStats {
    public: TierCounters,
    user_scoped: TierCounters,
    search: TierCounters,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, tier: Tier) -> Option<&TierCounters> {
        match tier {
            Tier::Public => Some(&self.public),
            Tier::UserScoped => Some(&self.user_scoped),
            Tier::Search => Some(&self.search),
            Tier::Uncacheable => None,
        }
    }

    pub fn record_hit(&self, tier: Tier) {
        if let Some(counters) = self.counters(tier) {
            counters.hits.fetch_add(1, Ordering::Relaxed);
            counter!(METRIC_CACHE_HIT, "tier" => tier.label()).increment(1);
        }
    }

    pub fn record_miss(&self, tier: Tier) {
        if let Some(counters) = self.counters(tier) {
            counters.misses.fetch_add(1, Ordering::Relaxed);
            counter!(METRIC_CACHE_MISS, "tier" => tier.label()).increment(1);
        }
    }

    pub fn record_set(&self, tier: Tier) {
        if let Some(counters) = self.counters(tier) {
            counters.sets.fetch_add(1, Ordering::Relaxed);
            counter!(METRIC_CACHE_SET, "tier" => tier.label()).increment(1);
        }
    }

    pub fn get(&self, tier: Tier) -> TierStats {
        self.counters(tier)
            .map(TierCounters::snapshot)
            .unwrap_or_default()
    }

    pub fn reset(&self, tier: Tier) {
        if let Some(counters) = self.counters(tier) {
            counters.reset();
        }
    }

    pub fn reset_all(&self) {
        for tier in Tier::CACHEABLE {
            self.reset(tier);
        }
    }

    pub fn aggregate(&self) -> AggregateStats {
        let per_tier = PerTierStats {
            public: self.get(Tier::Public),
            user_scoped: self.get(Tier::UserScoped),
            search: self.get(Tier::Search),
        };
        let total_hits = per_tier.public.hits + per_tier.user_scoped.hits + per_tier.search.hits;
        let total_misses =
            per_tier.public.misses + per_tier.user_scoped.misses + per_tier.search.misses;

        AggregateStats {
            per_tier,
            overall: OverallStats {
                total_hits,
                total_misses,
                overall_hit_rate: hit_rate(total_hits, total_misses),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn hit_rate_is_zero_without_observations() {
        let stats = CacheStats::new();
        assert_eq!(stats.get(Tier::Public), TierStats::default());
        assert_eq!(stats.aggregate().overall.overall_hit_rate, 0.0);
    }

    #[test]
    fn counts_are_tracked_per_tier() {
        let stats = CacheStats::new();
        stats.record_miss(Tier::Public);
        stats.record_set(Tier::Public);
        stats.record_hit(Tier::Public);
        stats.record_hit(Tier::Public);
        stats.record_hit(Tier::Public);
        stats.record_miss(Tier::Search);

        let public = stats.get(Tier::Public);
        assert_eq!((public.hits, public.misses, public.sets), (3, 1, 1));
        assert_eq!(public.hit_rate, 0.75);
        assert_eq!(stats.get(Tier::Search).misses, 1);
        assert_eq!(stats.get(Tier::UserScoped), TierStats::default());
    }

    #[test]
    fn uncacheable_is_never_counted() {
        let stats = CacheStats::new();
        stats.record_hit(Tier::Uncacheable);
        stats.record_miss(Tier::Uncacheable);
        assert_eq!(stats.aggregate(), AggregateStats::default());
    }

    #[test]
    fn aggregate_sums_every_tier() {
        let stats = CacheStats::new();
        stats.record_hit(Tier::Public);
        stats.record_hit(Tier::UserScoped);
        stats.record_miss(Tier::Search);
        stats.record_miss(Tier::Search);

        let overall = stats.aggregate().overall;
        assert_eq!(overall.total_hits, 2);
        assert_eq!(overall.total_misses, 2);
        assert_eq!(overall.overall_hit_rate, 0.5);
    }

    #[test]
    fn reset_clears_only_the_requested_tier() {
        let stats = CacheStats::new();
        stats.record_hit(Tier::Public);
        stats.record_hit(Tier::Search);

        stats.reset(Tier::Public);
        assert_eq!(stats.get(Tier::Public).hits, 0);
        assert_eq!(stats.get(Tier::Search).hits, 1);

        stats.reset_all();
        assert_eq!(stats.aggregate(), AggregateStats::default());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(CacheStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        stats.record_hit(Tier::UserScoped);
                        stats.record_miss(Tier::UserScoped);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let user = stats.get(Tier::UserScoped);
        assert_eq!(user.hits, 8_000);
        assert_eq!(user.misses, 8_000);
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let stats = CacheStats::new();
        stats.record_hit(Tier::Search);

        let json = serde_json::to_value(stats.aggregate()).expect("serialize stats");
        assert_eq!(json["perTier"]["search"]["hits"], 1);
        assert_eq!(json["perTier"]["userScoped"]["hitRate"], 0.0);
        assert_eq!(json["overall"]["totalHits"], 1);
        assert_eq!(json["overall"]["overallHitRate"], 1.0);
    }
}
