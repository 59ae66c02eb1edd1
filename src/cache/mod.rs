//! TechTrend Cache System
//!
//! Routes article-list requests through three cache tiers:
//!
//! - **Public**: anonymous listings (pagination, sort, source and category filters)
//! - **UserScoped**: listings filtered by one user's read state
//! - **Search**: free-text search results
//!
//! Anything else (tag filters, unknown read filters, bare user ids) is
//! `Uncacheable` and goes straight to the article query executor.
//!
//! A request flows through [`QueryParams::normalize`], [`classify`],
//! [`build_key`] and finally the tier's [`TierStore`], all orchestrated by
//! [`LayeredCache`].
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `techtrend.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"
//! public_ttl_seconds = 300
//! # ... see config.rs for all options
//! ```

mod backend;
mod config;
mod keys;
mod layered;
mod lock;
mod memory;
mod params;
#[cfg(feature = "redis")]
mod redis;
mod rules;
mod stats;
mod store;
mod tier;
mod trigger;

pub use backend::{BackendError, KvBackend};
pub use config::CacheConfig;
pub(crate) use config::{
    DEFAULT_PUBLIC_TTL_SECONDS, DEFAULT_SEARCH_TTL_SECONDS, DEFAULT_USER_TTL_SECONDS,
};
pub use keys::{CacheKey, build_key, normalize_search};
pub use layered::{LayeredCache, Resolution, resolve};
pub use memory::MemoryBackend;
pub use params::{NormalizedParams, ParamValue, QueryParams};
#[cfg(feature = "redis")]
pub use redis::RedisBackend;
pub use stats::{AggregateStats, CacheStats, OverallStats, PerTierStats, TierStats};
pub use store::{CacheError, TierStore};
pub use tier::{Tier, classify};
pub use trigger::{CacheEvent, CacheTrigger};
