//! Cache configuration.
//!
//! The enable switch and per-tier TTLs, resolved from the `[cache]` section of
//! `techtrend.toml`.

use std::time::Duration;

use super::tier::Tier;

// Default values for cache configuration
pub(crate) const DEFAULT_PUBLIC_TTL_SECONDS: u64 = 300;
pub(crate) const DEFAULT_USER_TTL_SECONDS: u64 = 60;
pub(crate) const DEFAULT_SEARCH_TTL_SECONDS: u64 = 600;

/// Cache routing configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Route requests through the cache at all.
    pub enabled: bool,
    /// TTL for anonymous listings.
    pub public_ttl_seconds: u64,
    /// TTL for read-state filtered listings.
    pub user_ttl_seconds: u64,
    /// TTL for search results.
    pub search_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_ttl_seconds: DEFAULT_PUBLIC_TTL_SECONDS,
            user_ttl_seconds: DEFAULT_USER_TTL_SECONDS,
            search_ttl_seconds: DEFAULT_SEARCH_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            public_ttl_seconds: settings.public_ttl.as_secs(),
            user_ttl_seconds: settings.user_ttl.as_secs(),
            search_ttl_seconds: settings.search_ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    /// TTL for entries stored in `tier`; zero for [`Tier::Uncacheable`].
    pub fn ttl_for(&self, tier: Tier) -> Duration {
        let seconds = match tier {
            Tier::Public => self.public_ttl_seconds,
            Tier::UserScoped => self.user_ttl_seconds,
            Tier::Search => self.search_ttl_seconds,
            Tier::Uncacheable => 0,
        };
        Duration::from_secs(seconds)
    }
}
