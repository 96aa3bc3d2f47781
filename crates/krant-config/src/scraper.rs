//! `scraper.*` configuration (§6) plus the named profile presets (§9 open
//! question: presets are constructors over this struct, not branches).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub rate_limit_seconds: u64,
    pub max_concurrent: usize,
    pub interval_min: u64,
    pub max_articles_per_scrape: u32,
    pub enable_robots_txt_check: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            rate_limit_seconds: 3,
            max_concurrent: 5,
            interval_min: 15,
            max_articles_per_scrape: 100,
            enable_robots_txt_check: true,
        }
    }
}

impl ScraperConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            rate_limit_seconds: loader.get_uint("scraper_rate_limit_seconds").unwrap_or(defaults.rate_limit_seconds),
            max_concurrent: loader
                .get_uint("scraper_max_concurrent")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_concurrent),
            interval_min: loader.get_uint("scraper_interval_min").unwrap_or(defaults.interval_min),
            max_articles_per_scrape: loader
                .get_uint("scraper_max_articles_per_scrape")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_articles_per_scrape),
            enable_robots_txt_check: loader
                .get_bool("scraper_enable_robots_txt_check")
                .unwrap_or(defaults.enable_robots_txt_check),
        }
    }
}

/// Named bundles of the options above. Business logic never branches on
/// which profile produced a `ScraperConfig`; it only ever sees the struct.
pub enum ScraperProfile {}

impl ScraperProfile {
    pub fn fast() -> ScraperConfig {
        ScraperConfig {
            rate_limit_seconds: 1,
            max_concurrent: 10,
            interval_min: 5,
            max_articles_per_scrape: 50,
            enable_robots_txt_check: false,
        }
    }

    pub fn balanced() -> ScraperConfig {
        ScraperConfig::default()
    }

    pub fn deep() -> ScraperConfig {
        ScraperConfig {
            rate_limit_seconds: 5,
            max_concurrent: 3,
            interval_min: 30,
            max_articles_per_scrape: 250,
            enable_robots_txt_check: true,
        }
    }

    pub fn conservative() -> ScraperConfig {
        ScraperConfig {
            rate_limit_seconds: 10,
            max_concurrent: 2,
            interval_min: 60,
            max_articles_per_scrape: 50,
            enable_robots_txt_check: true,
        }
    }
}
