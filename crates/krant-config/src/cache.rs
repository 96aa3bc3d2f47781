//! `cache.*` configuration (§6).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub default_ttl_minutes: u64,
    pub compression_threshold_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: 5,
            compression_threshold_bytes: 1024,
        }
    }
}

impl CacheConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_minutes: loader.get_uint("cache_default_ttl_minutes").unwrap_or(defaults.default_ttl_minutes),
            compression_threshold_bytes: loader
                .get_uint("cache_compression_threshold")
                .map(|v| v as usize)
                .unwrap_or(defaults.compression_threshold_bytes),
        }
    }
}
