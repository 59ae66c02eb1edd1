//! Article listing served through the layered cache.
//!
//! The query executor (SQL, full-text search, ...) lives elsewhere and is
//! reached through [`ArticleQuery`]; this module only decides whether its
//! result is served from, or written to, the cache.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::cache::{LayeredCache, NormalizedParams, QueryParams};

#[derive(Debug, Error)]
pub enum ArticleQueryError {
    #[error("article query timed out")]
    Timeout,
    #[error("article store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid filter `{field}`: {reason}")]
    InvalidFilter { field: String, reason: String },
}

/// The external article query executor.
#[async_trait]
pub trait ArticleQuery: Send + Sync {
    /// A paginated list-of-articles payload.
    type Page: Serialize + DeserializeOwned + Send;

    async fn list(&self, params: &NormalizedParams) -> Result<Self::Page, ArticleQueryError>;
}

/// Read-through article listing service.
pub struct ArticleFeed<Q> {
    cache: Arc<LayeredCache>,
    query: Arc<Q>,
}

impl<Q> Clone for ArticleFeed<Q> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            query: Arc::clone(&self.query),
        }
    }
}

impl<Q: ArticleQuery> ArticleFeed<Q> {
    pub fn new(cache: Arc<LayeredCache>, query: Arc<Q>) -> Self {
        Self { cache, query }
    }

    /// List articles for `params`, served from the cache when the request is cacheable.
    #[instrument(skip_all, fields(params = params.len()))]
    pub async fn list(&self, params: &QueryParams) -> Result<Q::Page, ArticleQueryError> {
        let normalized = params.normalize();
        let query = &self.query;
        self.cache
            .fetch(params, || async move { query.list(&normalized).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use super::*;
    use crate::cache::{CacheConfig, MemoryBackend};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Page {
        titles: Vec<String>,
        page: i64,
    }

    #[derive(Default)]
    struct StubQuery {
        calls: AtomicUsize,
        seen: Mutex<Vec<NormalizedParams>>,
        fail: bool,
    }

    #[async_trait]
    impl ArticleQuery for StubQuery {
        type Page = Page;

        async fn list(&self, params: &NormalizedParams) -> Result<Page, ArticleQueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().expect("seen lock").push(params.clone());
            if self.fail {
                return Err(ArticleQueryError::Timeout);
            }
            let page = params
                .rendered("page")
                .and_then(|page| page.parse().ok())
                .unwrap_or(1);
            Ok(Page {
                titles: vec!["Rust 2026".to_string()],
                page,
            })
        }
    }

    fn feed(query: StubQuery) -> (ArticleFeed<StubQuery>, Arc<StubQuery>) {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(16).expect("capacity")));
        let cache = Arc::new(LayeredCache::new(CacheConfig::default(), backend));
        let query = Arc::new(query);
        (ArticleFeed::new(cache, Arc::clone(&query)), query)
    }

    #[tokio::test]
    async fn repeated_listing_hits_the_cache() {
        let (feed, query) = feed(StubQuery::default());
        let params = QueryParams::from_query_str("page=2&limit=20");

        let first = feed.list(&params).await.expect("first");
        let second = feed.list(&params).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(first.page, 2);
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn executor_receives_normalized_params() {
        let (feed, query) = feed(StubQuery::default());
        let params = QueryParams::from_query_str("page=1&search=&tag=react");

        feed.list(&params).await.expect("listing");

        let seen = query.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].contains("search"));
        assert_eq!(seen[0].rendered("tag").as_deref(), Some("react"));
    }

    #[tokio::test]
    async fn tag_filtered_listing_is_never_cached() {
        let (feed, query) = feed(StubQuery::default());
        let params = QueryParams::new().with("tag", "react");

        feed.list(&params).await.expect("first");
        feed.list(&params).await.expect("second");

        assert_eq!(query.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn executor_failure_propagates_and_is_not_cached() {
        let (feed, query) = feed(StubQuery {
            fail: true,
            ..Default::default()
        });
        let params = QueryParams::new().with("page", 1);

        assert!(matches!(
            feed.list(&params).await,
            Err(ArticleQueryError::Timeout)
        ));
        assert!(feed.list(&params).await.is_err());
        assert_eq!(query.calls.load(Ordering::SeqCst), 2);
    }
}
