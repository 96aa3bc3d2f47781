//! `browser.*` configuration (§6).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub pool_size: usize,
    pub max_concurrent: usize,
    pub timeout_seconds: u64,
    pub wait_after_load_ms: u64,
    pub fallback_only: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pool_size: 5,
            max_concurrent: 3,
            timeout_seconds: 15,
            wait_after_load_ms: 1500,
            fallback_only: true,
        }
    }
}

impl BrowserConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            enabled: loader.get_bool("browser_enabled").unwrap_or(defaults.enabled),
            pool_size: loader.get_uint("browser_pool_size").map(|v| v as usize).unwrap_or(defaults.pool_size),
            max_concurrent: loader
                .get_uint("browser_max_concurrent")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_concurrent),
            timeout_seconds: loader.get_uint("browser_timeout_seconds").unwrap_or(defaults.timeout_seconds),
            wait_after_load_ms: loader
                .get_uint("browser_wait_after_load_ms")
                .unwrap_or(defaults.wait_after_load_ms),
            fallback_only: loader.get_bool("browser_fallback_only").unwrap_or(defaults.fallback_only),
        }
    }
}
