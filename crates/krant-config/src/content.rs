//! `content.*` configuration (§6) — governs C7's own ticker.

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, PartialEq)]
pub struct ContentConfig {
    pub enabled: bool,
    pub interval_min: u64,
    pub batch_size: u32,
    pub run_async: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_min: 10,
            batch_size: 15,
            run_async: true,
        }
    }
}

impl ContentConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            enabled: loader.get_bool("content_enabled").unwrap_or(defaults.enabled),
            interval_min: loader.get_uint("content_interval_min").unwrap_or(defaults.interval_min),
            batch_size: loader.get_uint("content_batch_size").map(|v| v as u32).unwrap_or(defaults.batch_size),
            run_async: loader.get_bool("content_async").unwrap_or(defaults.run_async),
        }
    }
}
