//! Key/value cache with per-entry TTL.
//!
//! Two backends share the [`CacheStore`] interface: Redis when `cache.redis_url`
//! is configured, an in-process map otherwise. Neither evicts anything besides
//! expired entries.

use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

mod error;
pub use error::{CacheError, CacheResult};

mod memory;
pub use memory::MemoryCache;

mod redis_store;
pub use redis_store::RedisCache;

use crate::Config;

#[async_trait::async_trait]
pub trait CacheStore: std::fmt::Debug + Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns whether the key existed.
    async fn del(&self, key: &str) -> CacheResult<bool>;

    async fn flush_all(&self) -> CacheResult<()>;
}

pub type SharedCache = Arc<dyn CacheStore>;

/// Picks the backend from the configuration.
pub async fn connect(config: &Config) -> CacheResult<SharedCache> {
    match config.cache().redis_url() {
        Some(url) => {
            tracing::info!("using redis cache backend");
            Ok(Arc::new(RedisCache::connect(url).await?))
        }
        None => {
            tracing::info!("no redis_url configured, using in-memory cache backend");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> CacheResult<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + Sync>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> CacheResult<()> {
    let raw = serde_json::to_string(value)?;
    cache.set_ex(key, &raw, ttl).await
}

/// Longest TTL either backend accepts.
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

pub(crate) fn validate_ttl(ttl: Duration) -> CacheResult<u64> {
    match ttl.as_secs() {
        0 => Err(CacheError::InvalidTtl),
        secs if secs > MAX_TTL.as_secs() => Err(CacheError::InvalidTtl),
        secs => Ok(secs),
    }
}
