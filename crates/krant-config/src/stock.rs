//! `stock.*` configuration (§6).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockProvider {
    AlphaVantage,
    Fmp,
}

impl StockProvider {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fmp" => StockProvider::Fmp,
            _ => StockProvider::AlphaVantage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockConfig {
    pub provider: StockProvider,
    pub rate_limit_per_minute: u32,
    pub cache_ttl_minutes: u64,
    pub enable_cache: bool,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            provider: StockProvider::AlphaVantage,
            rate_limit_per_minute: 30,
            cache_ttl_minutes: 5,
            enable_cache: true,
        }
    }
}

impl StockConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            provider: loader
                .get_optional("stock_provider")
                .map(|v| StockProvider::parse(&v))
                .unwrap_or(defaults.provider),
            rate_limit_per_minute: loader
                .get_uint("stock_rate_limit_per_minute")
                .map(|v| v as u32)
                .unwrap_or(defaults.rate_limit_per_minute),
            cache_ttl_minutes: loader.get_uint("stock_cache_ttl_minutes").unwrap_or(defaults.cache_ttl_minutes),
            enable_cache: loader.get_bool("stock_enable_cache").unwrap_or(defaults.enable_cache),
        }
    }
}
