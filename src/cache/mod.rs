//! Cache layer
//!
//! The post service caches single posts and list pages and invalidates them
//! on writes. Two backends: in-process moka for the single-instance deploy
//! (default) and Redis behind the `redis-cache` feature for multi-instance
//! setups. Values are JSON strings either way, so any serde type caches.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Cache operations shared by all backends.
///
/// The generic methods make this trait non-object-safe; the [`Cache`] enum
/// is the runtime-polymorphic handle instead of `dyn CacheLayer`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`posts:*`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Configured cache backend
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

macro_rules! backend {
    ($self:ident, $cache:ident => $call:expr) => {
        match $self {
            Cache::Memory($cache) => $call,
            #[cfg(feature = "redis-cache")]
            Cache::Redis($cache) => $call,
        }
    };
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        backend!(self, cache => cache.get(key).await)
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        backend!(self, cache => cache.set(key, value, ttl).await)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        backend!(self, cache => cache.delete(key).await)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        backend!(self, cache => cache.delete_pattern(pattern).await)
    }

    async fn clear(&self) -> Result<()> {
        backend!(self, cache => cache.clear().await)
    }
}

/// Build the cache named by configuration.
///
/// Selecting Redis without the `redis-cache` feature (or without a URL) is
/// a startup error rather than a silent fallback to the memory backend.
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let ttl = Duration::from_secs(config.ttl_seconds);

    match config.driver {
        CacheDriver::Memory => Ok(Arc::new(Cache::Memory(MemoryCache::with_capacity_and_ttl(
            10_000, ttl,
        )))),
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the Redis cache driver. \
                         Set 'redis_url' in cache configuration or DAWAN_CACHE_REDIS_URL."
                    )
                })?;

                let cache = RedisCache::with_ttl(redis_url, ttl).await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis cache driver is configured but the 'redis-cache' feature is not \
                     enabled. Build with `--features redis-cache` or use the 'memory' driver."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_memory_backend() {
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        assert!(matches!(*cache, Cache::Memory(_)));

        cache
            .set("post:slug:hello", &42i64, Duration::from_secs(60))
            .await
            .unwrap();
        let cached: Option<i64> = cache.get("post:slug:hello").await.unwrap();
        assert_eq!(cached, Some(42));
    }

    #[tokio::test]
    async fn custom_ttl_config_is_accepted() {
        let config = CacheConfig {
            driver: CacheDriver::Memory,
            redis_url: None,
            ttl_seconds: 1800,
        };
        let cache = create_cache(&config).await.unwrap();

        cache
            .set("posts:list:1:10", &"page".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cached: Option<String> = cache.get("posts:list:1:10").await.unwrap();
        assert_eq!(cached, Some("page".to_string()));
    }

    #[cfg(not(feature = "redis-cache"))]
    #[tokio::test]
    async fn redis_driver_without_feature_fails_at_startup() {
        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
            ttl_seconds: 3600,
        };

        let err = create_cache(&config).await.unwrap_err().to_string();
        assert!(err.contains("redis-cache"));
    }

    #[cfg(feature = "redis-cache")]
    #[tokio::test]
    async fn redis_driver_without_url_fails_at_startup() {
        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: None,
            ttl_seconds: 3600,
        };

        let err = create_cache(&config).await.unwrap_err().to_string();
        assert!(err.contains("Redis URL"));
    }

    #[cfg(feature = "redis-cache")]
    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn redis_driver_roundtrip() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: Some(redis_url),
            ttl_seconds: 3600,
        };

        let cache = create_cache(&config).await.unwrap();

        cache
            .set("factory:roundtrip", &"ok".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cached: Option<String> = cache.get("factory:roundtrip").await.unwrap();
        assert_eq!(cached, Some("ok".to_string()));

        cache.delete("factory:roundtrip").await.unwrap();
    }
}
