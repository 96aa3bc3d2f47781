//! Cache layer (C11): TTL, compression, stale-while-revalidate, and
//! pattern invalidation over a Redis-backed [`krant_types::ports::cache::CacheStorage`].

pub mod compression;
pub mod dynamic_ttl;
pub mod redis_storage;

pub use dynamic_ttl::{dynamic_ttl, AccessFrequency};
pub use redis_storage::RedisStorage;
