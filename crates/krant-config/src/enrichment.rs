//! `enrichment.*` configuration (§6).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub workers: usize,
    pub batch_size: u32,
    pub interval_min: u64,
    pub llm_timeout_seconds: u64,
    pub daily_budget_usd: Option<f64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 4,
            batch_size: 15,
            interval_min: 5,
            llm_timeout_seconds: 30,
            daily_budget_usd: None,
        }
    }
}

impl EnrichmentConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            enabled: loader.get_bool("enrichment_enabled").unwrap_or(defaults.enabled),
            workers: loader.get_uint("enrichment_workers").map(|v| v as usize).unwrap_or(defaults.workers),
            batch_size: loader
                .get_uint("enrichment_batch_size")
                .map(|v| v as u32)
                .unwrap_or(defaults.batch_size),
            interval_min: loader.get_uint("enrichment_interval_min").unwrap_or(defaults.interval_min),
            llm_timeout_seconds: loader
                .get_uint("enrichment_llm_timeout_seconds")
                .unwrap_or(defaults.llm_timeout_seconds),
            daily_budget_usd: loader.get_float("enrichment_daily_budget_usd").ok(),
        }
    }

    /// Table used by the adaptive-pacing feedback controller (§4.9, §9):
    /// discrete levels, not a continuous PID.
    pub fn adaptive_interval_min(&self, queue_len: usize) -> u64 {
        if queue_len > 20 {
            2
        } else if queue_len < 5 {
            15
        } else {
            self.interval_min
        }
    }
}
