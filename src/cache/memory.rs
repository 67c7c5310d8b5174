//! In-memory cache backed by moka
//!
//! Single-instance backend. Entries are JSON strings behind an `Arc` so
//! clones out of the cache are cheap; expiry is moka's cache-wide
//! time-to-live. Pattern deletion walks the key set with a small glob
//! matcher (`*` any run, `?` one character).

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Serialized cache value
#[derive(Clone)]
struct Entry(Arc<str>);

impl Entry {
    fn encode<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self(json.into()))
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.0).context("Failed to deserialize cache value")
    }
}

pub struct MemoryCache {
    cache: Cache<String, Entry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::with_capacity_and_ttl(max_capacity, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Iterative wildcard match with single-star backtracking: when a later
    /// literal mismatches, retry from one position past where the last `*`
    /// started matching.
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let p: Vec<char> = pattern.chars().collect();
        let k: Vec<char> = key.chars().collect();

        let (mut pi, mut ki) = (0usize, 0usize);
        let mut star: Option<usize> = None;
        let mut resume = 0usize;

        while ki < k.len() {
            if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
                pi += 1;
                ki += 1;
            } else if pi < p.len() && p[pi] == '*' {
                star = Some(pi);
                resume = ki;
                pi += 1;
            } else if let Some(s) = star {
                pi = s + 1;
                resume += 1;
                ki = resume;
            } else {
                return false;
            }
        }

        p[pi..].iter().all(|&c| c == '*')
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        self.cache
            .get(key)
            .await
            .map(|entry| entry.decode())
            .transpose()
    }

    /// moka only supports a cache-wide time_to_live, so the per-entry `ttl`
    /// acts as an upper bound through the cache default.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let _ = ttl;
        self.cache.insert(key.to_string(), Entry::encode(value)?).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    /// Walks every key; fine at our capacity.
    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let doomed: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| Self::pattern_matches(pattern, key.as_str()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in doomed {
            self.cache.invalidate(&key).await;
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}
