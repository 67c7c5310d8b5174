//! Redis cache implementation for multi-instance deployments
//!
//! Values are stored as JSON strings. TTL expiration goes through SETEX,
//! pattern deletion through SCAN + DEL (never KEYS, which blocks the server).

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Keys to scan per iteration in delete_pattern
const SCAN_COUNT: usize = 100;

pub struct RedisCache {
    connection: MultiplexedConnection,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to Redis at the given URL (e.g. `redis://localhost:6379`).
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::with_ttl(redis_url, DEFAULT_TTL).await
    }

    pub async fn with_ttl(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // Multiplexed connections are cheap handles; each call clones its own.
    fn conn(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self.conn().get(key).await.context("Redis GET failed")?;

        raw.map(|json| serde_json::from_str(&json).context("Failed to deserialize cached value"))
            .transpose()
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;

        // SETEX wants whole seconds and rejects 0
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = self
            .conn()
            .set_ex(key, json, ttl_secs)
            .await
            .context("Redis SETEX failed")?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _: () = self.conn().del(key).await.context("Redis DEL failed")?;
        Ok(())
    }

    /// Delete all keys matching a glob pattern, e.g. `posts:*`. Redis MATCH
    /// patterns are already glob-style, so the pattern passes through
    /// unchanged.
    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.conn();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Redis SCAN failed")?;

            if !batch.is_empty() {
                let _: () = conn.del(&batch).await.context("Redis DEL failed")?;
            }

            cursor = next;
            if cursor == 0 {
                return Ok(());
            }
        }
    }

    /// Clears ALL keys in the current Redis database (FLUSHDB).
    async fn clear(&self) -> Result<()> {
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut self.conn())
            .await
            .context("Redis FLUSHDB failed")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests against a live server; run with
    //   cargo test --features redis-cache -- --ignored
    // against a dedicated test database (clear() issues FLUSHDB).

    const MINUTE: Duration = Duration::from_secs(60);

    async fn connect() -> RedisCache {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisCache::new(&url).await.expect("redis connection")
    }

    async fn put(cache: &RedisCache, key: &str, value: &str) {
        cache.set(key, &value.to_string(), MINUTE).await.expect("set");
    }

    async fn fetch(cache: &RedisCache, key: &str) -> Option<String> {
        cache.get(key).await.expect("get")
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn roundtrip_and_delete() {
        let cache = connect().await;

        put(&cache, "it:post:slug:drought-update", "cached-post").await;
        assert_eq!(
            fetch(&cache, "it:post:slug:drought-update").await,
            Some("cached-post".to_string())
        );

        cache.delete("it:post:slug:drought-update").await.expect("delete");
        assert_eq!(fetch(&cache, "it:post:slug:drought-update").await, None);
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn missing_key_is_none() {
        let cache = connect().await;
        assert_eq!(fetch(&cache, "it:post:slug:never-written").await, None);
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn pattern_delete_scans_only_the_prefix() {
        let cache = connect().await;

        put(&cache, "it:posts:list:1:10", "page-one").await;
        put(&cache, "it:posts:list:2:10", "page-two").await;
        put(&cache, "it:podcasts:list:1:10", "podcast-page").await;

        cache.delete_pattern("it:posts:*").await.expect("delete_pattern");

        assert_eq!(fetch(&cache, "it:posts:list:1:10").await, None);
        assert_eq!(fetch(&cache, "it:posts:list:2:10").await, None);
        assert_eq!(
            fetch(&cache, "it:podcasts:list:1:10").await,
            Some("podcast-page".to_string())
        );

        cache.delete("it:podcasts:list:1:10").await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn question_mark_matches_single_character() {
        let cache = connect().await;

        put(&cache, "it:post:id:7", "seven").await;
        put(&cache, "it:post:id:70", "seventy").await;

        cache.delete_pattern("it:post:id:?").await.expect("delete_pattern");

        assert_eq!(fetch(&cache, "it:post:id:7").await, None);
        // "70" is two characters
        assert_eq!(fetch(&cache, "it:post:id:70").await, Some("seventy".to_string()));

        cache.delete("it:post:id:70").await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn entries_expire_via_setex() {
        let cache = connect().await;

        cache
            .set("it:post:id:1", &"short-lived".to_string(), Duration::from_secs(1))
            .await
            .expect("set");
        assert_eq!(fetch(&cache, "it:post:id:1").await, Some("short-lived".to_string()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fetch(&cache, "it:post:id:1").await, None);
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn structured_values_roundtrip() {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Summary {
            id: i64,
            title: String,
            excerpt: Option<String>,
        }

        let cache = connect().await;
        let summary = Summary {
            id: 1,
            title: "Election results".to_string(),
            excerpt: None,
        };

        cache.set("it:post:id:1:summary", &summary, MINUTE).await.expect("set");

        let cached: Option<Summary> = cache.get("it:post:id:1:summary").await.expect("get");
        assert_eq!(cached, Some(summary));

        cache.delete("it:post:id:1:summary").await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn overwrite_replaces_value() {
        let cache = connect().await;

        put(&cache, "it:post:id:2", "before-edit").await;
        put(&cache, "it:post:id:2", "after-edit").await;

        assert_eq!(fetch(&cache, "it:post:id:2").await, Some("after-edit".to_string()));

        cache.delete("it:post:id:2").await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn clear_flushes_the_database() {
        let cache = connect().await;

        put(&cache, "it:flush:a", "x").await;
        put(&cache, "it:flush:b", "y").await;

        cache.clear().await.expect("clear");

        assert_eq!(fetch(&cache, "it:flush:a").await, None);
        assert_eq!(fetch(&cache, "it:flush:b").await, None);
    }
}
