//! Cache backend bootstrap from resolved settings.

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheConfig, KvBackend, LayeredCache, MemoryBackend};
use crate::config::{CacheBackendKind, CacheSettings};

use super::error::InfraError;

/// Build the configured key-value backend.
///
/// Selecting `redis` in a build without the `redis` feature is a configuration error.
pub async fn build_backend(settings: &CacheSettings) -> Result<Arc<dyn KvBackend>, InfraError> {
    match &settings.backend {
        CacheBackendKind::Memory => {
            info!(
                backend = "memory",
                capacity = settings.memory_capacity.get(),
                "cache backend ready"
            );
            Ok(Arc::new(MemoryBackend::new(settings.memory_capacity)))
        }
        CacheBackendKind::Redis { url } => connect_redis(url).await,
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(url: &str) -> Result<Arc<dyn KvBackend>, InfraError> {
    let backend = crate::cache::RedisBackend::connect(url).await?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_url: &str) -> Result<Arc<dyn KvBackend>, InfraError> {
    Err(InfraError::configuration(
        "cache.backend = \"redis\" requires building with the `redis` feature",
    ))
}

/// Build the backend and wrap it in a [`LayeredCache`].
pub async fn build_cache(settings: &CacheSettings) -> Result<Arc<LayeredCache>, InfraError> {
    let backend = build_backend(settings).await?;
    let config = CacheConfig::from(settings);
    if !config.enabled {
        info!("cache disabled; every request goes to the article store");
    }
    Ok(Arc::new(LayeredCache::new(config, backend)))
}
