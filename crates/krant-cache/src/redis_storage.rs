//! Redis-backed [`CacheStorage`] (C11), grounded on the corpus's
//! multiplexed-connection adapter: cheap `Clone` over one shared connection,
//! pipelined batch ops, and a `SCAN`/`MATCH`/`COUNT` snapshot loop for
//! pattern invalidation rather than iterate-and-delete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use krant_config::cache::CacheConfig;
use krant_types::cache::CacheEntry;
use krant_types::error::{KrantError, Result};
use krant_types::ports::cache::{CacheStats, CacheStorage};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, warn};

use crate::compression;

const SCAN_BATCH: usize = 100;

pub struct RedisStorage {
    conn: MultiplexedConnection,
    client: Client,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    compression_threshold: usize,
}

impl RedisStorage {
    pub async fn new(redis_url: &str, config: &CacheConfig) -> anyhow::Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            conn,
            client,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            compression_threshold: config.compression_threshold_bytes,
        })
    }

    fn convert_error(err: RedisError) -> KrantError {
        KrantError::Storage(format!("redis error: {err}"))
    }

    async fn get_db_size(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)
    }

    async fn get_memory_bytes(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let info: String = redis::cmd("INFO")
            .arg("MEMORY")
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        for line in info.lines() {
            if let Some(value) = line.strip_prefix("used_memory:") {
                return Ok(value.trim().parse().unwrap_or(0));
            }
        }
        Ok(0)
    }

    /// Stores `value` wrapped in a [`CacheEntry`] with a stale-while-revalidate
    /// window: fresh until `fresh_ttl`, servable-but-stale until `fresh_ttl +
    /// stale_ttl`. The Redis key TTL is set to the full fresh+stale span so
    /// the entry outlives its own freshness without needing a second write.
    pub async fn set_with_swr(
        &self,
        key: &str,
        value: Vec<u8>,
        fresh_ttl: Duration,
        stale_ttl: Duration,
    ) -> Result<()> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(fresh_ttl).unwrap_or_default();
        let stale_until =
            expires_at + chrono::Duration::from_std(stale_ttl).unwrap_or_default();

        let compressed = value.len() > self.compression_threshold;
        let stored_value = if compressed {
            compression::encode(&value, self.compression_threshold)?
        } else {
            value
        };

        let entry = CacheEntry::new(stored_value, compressed, expires_at).with_stale_until(stale_until);
        let serialized = serde_json::to_vec(&entry)
            .map_err(|e| KrantError::Storage(format!("swr entry encode: {e}")))?;

        let mut conn = self.conn.clone();
        let total_ttl = fresh_ttl + stale_ttl;
        conn.set_ex::<_, _, ()>(key, serialized, total_ttl.as_secs().max(1))
            .await
            .map_err(Self::convert_error)?;
        Ok(())
    }

    /// Returns `(value, is_stale)` for an SWR entry, or `None` if absent or
    /// past its stale window. Callers use `is_stale` to decide whether to
    /// trigger a background refresh while still serving this value.
    pub async fn get_with_swr(&self, key: &str) -> Result<Option<(Vec<u8>, bool)>> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await.map_err(Self::convert_error)?;
        let Some(raw) = raw else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_slice(&raw)
            .map_err(|e| KrantError::Decode(format!("swr entry decode: {e}")))?;

        let now = Utc::now();
        if !entry.is_servable(now) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        let value = if entry.compressed {
            compression::decode(&entry.value)?
        } else {
            entry.value
        };
        Ok(Some((value, !entry.is_fresh(now))))
    }
}

impl Clone for RedisStorage {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            client: self.client.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            compression_threshold: self.compression_threshold,
        }
    }
}

#[async_trait]
impl CacheStorage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let stored: Option<Vec<u8>> = conn.get(key).await.map_err(Self::convert_error)?;
        match stored {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache hit");
                Ok(Some(compression::decode(&bytes)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let encoded = compression::encode(&value, self.compression_threshold)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, encoded, ttl.as_secs().max(1))
            .await
            .map_err(Self::convert_error)?;
        debug!(key, ttl_secs = ttl.as_secs(), "cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(Self::convert_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(Self::convert_error)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let raw: Vec<Option<Vec<u8>>> = conn.get(keys).await.map_err(Self::convert_error)?;
        let mut out = Vec::with_capacity(raw.len());
        for item in raw {
            match item {
                Some(bytes) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    out.push(Some(compression::decode(&bytes)?));
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    out.push(None);
                }
            }
        }
        Ok(out)
    }

    async fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        let ttl_secs = ttl.as_secs().max(1);
        for (key, value) in entries {
            let encoded = compression::encode(value, self.compression_threshold)?;
            pipe.set_ex(key, encoded, ttl_secs);
        }
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        debug!(count = entries.len(), "cache batch set");
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.del(keys).await.map_err(Self::convert_error)
    }

    async fn clear_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut total_deleted = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(Self::convert_error)?;

            // Collect the whole batch before deleting so a key written
            // mid-scan by another task is never silently dropped.
            if !keys.is_empty() {
                total_deleted += self.delete_many(&keys).await?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        warn!(pattern, deleted = total_deleted, "cleared keys matching pattern");
        Ok(total_deleted)
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            total_keys: self.get_db_size().await.unwrap_or(0),
            memory_bytes: self.get_memory_bytes().await.unwrap_or(0),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::convert_error)?;
        Ok(pong == "PONG")
    }
}
