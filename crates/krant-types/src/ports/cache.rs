//! The cache port consumed by `krant-cache`'s implementation and by
//! `krant-scraper`/`krant-workers` as callers (C11, §6).
//!
//! Shape mirrors the teacher's `ports::cache::CacheStorage`: a handful of
//! required primitives plus default implementations for batch/derived
//! operations that a backend can override when it has something more
//! efficient than a sequential fallback (e.g. Redis pipelining).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub total_keys: u64,
    pub memory_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    async fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value.clone(), ttl).await?;
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for key in keys {
            self.delete(key).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Snapshot-scan-then-delete: implementations must collect the full
    /// matching key set before issuing any delete, so a key written mid-scan
    /// is never dropped by a concurrent invalidation pass.
    async fn clear_pattern(&self, pattern: &str) -> Result<u64>;

    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats::default())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
