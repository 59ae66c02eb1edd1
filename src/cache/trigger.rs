//! Cache trigger service.
//!
//! Write paths call into this after a successful commit so stale listings are
//! dropped before the next read.

use std::sync::Arc;

use tracing::debug;

use super::layered::LayeredCache;

/// A write that may have made cached listings stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    ArticleUpserted { article_id: String },
    ArticleDeleted { article_id: String },
    ReadStateChanged { user_id: String },
    FavoriteChanged { user_id: String },
}

/// Cache trigger for write operations.
///
/// # Usage
///
/// ```ignore
/// // After marking an article read:
/// trigger.read_state_changed(&user_id).await;
/// ```
#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<LayeredCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<LayeredCache>) -> Self {
        Self { cache }
    }

    /// Invalidate whatever `event` affects and return the number of keys removed.
    pub async fn trigger(&self, event: CacheEvent) -> u64 {
        if !self.cache.config().enabled {
            debug!(event = ?event, "Cache trigger skipped: cache disabled");
            return 0;
        }

        debug!(event = ?event, "Cache trigger");
        match &event {
            CacheEvent::ArticleUpserted { .. } | CacheEvent::ArticleDeleted { .. } => {
                self.cache.invalidate_articles().await
            }
            CacheEvent::ReadStateChanged { user_id } | CacheEvent::FavoriteChanged { user_id } => {
                self.cache.invalidate_user(user_id).await
            }
        }
    }

    /// Trigger an article upsert event (create or update).
    pub async fn article_upserted(&self, article_id: &str) -> u64 {
        self.trigger(CacheEvent::ArticleUpserted {
            article_id: article_id.to_string(),
        })
        .await
    }

    pub async fn article_deleted(&self, article_id: &str) -> u64 {
        self.trigger(CacheEvent::ArticleDeleted {
            article_id: article_id.to_string(),
        })
        .await
    }

    /// A user marked an article read or unread.
    pub async fn read_state_changed(&self, user_id: &str) -> u64 {
        self.trigger(CacheEvent::ReadStateChanged {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn favorite_changed(&self, user_id: &str) -> u64 {
        self.trigger(CacheEvent::FavoriteChanged {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub fn cache(&self) -> &Arc<LayeredCache> {
        &self.cache
    }
}
