//! Browser-rendered extraction (C6): wraps the pool (C5) with navigation,
//! cookie-consent dismissal, and a small scroll to trigger lazy loading,
//! then hands the rendered DOM to C4's selector ladder.

use std::sync::Arc;
use std::time::Duration;

use krant_html::extractor::{self, ExtractedContent};
use krant_types::error::{KrantError, Result};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::pool::{BrowserPool, PoolStats};

/// Common Dutch cookie-consent banner selectors, tried in order; the first
/// that resolves to a clickable element is clicked and extraction proceeds.
const COOKIE_CONSENT_SELECTORS: &[&str] = &[
    "#cookiewall-accept",
    "button[data-testid='accept-cookies']",
    ".cookie-consent button.accept",
    "#onetrust-accept-btn-handler",
    "button.consent-accept",
];

pub struct BrowserExtractorConfig {
    pub navigation_timeout: Duration,
    pub wait_after_load: Duration,
    pub max_concurrent: usize,
}

impl Default for BrowserExtractorConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            wait_after_load: Duration::from_millis(1500),
            max_concurrent: 3,
        }
    }
}

pub struct BrowserExtractor {
    pool: Arc<BrowserPool>,
    config: BrowserExtractorConfig,
    inflight: Arc<Semaphore>,
}

impl BrowserExtractor {
    pub fn new(pool: Arc<BrowserPool>, config: BrowserExtractorConfig) -> Self {
        let inflight = Arc::new(Semaphore::new(config.max_concurrent));
        Self { pool, config, inflight }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub async fn extract(&self, url: &str, domain: &str) -> Result<ExtractedContent> {
        let _permit = self
            .inflight
            .acquire()
            .await
            .map_err(|_| KrantError::Cancelled)?;

        let mut checkout = self.pool.acquire().await?;
        checkout.record_use(chrono::Utc::now());

        let page = tokio::time::timeout(self.config.navigation_timeout, checkout.browser().new_page(url))
            .await
            .map_err(|_| KrantError::Timeout(self.config.navigation_timeout.as_millis() as u64))?
            .map_err(|e| KrantError::Network(e.to_string()))?;

        tokio::time::sleep(self.config.wait_after_load).await;

        self.dismiss_cookie_consent(&page).await;
        self.trigger_lazy_load(&page).await;

        let html = page.content().await.map_err(|e| KrantError::Decode(e.to_string()))?;

        extractor::extract(&html, domain)
    }

    async fn dismiss_cookie_consent(&self, page: &spider_chrome::Page) {
        for selector in COOKIE_CONSENT_SELECTORS {
            if let Ok(element) = page.find_element(selector).await {
                if element.click().await.is_ok() {
                    debug!(selector, "dismissed cookie-consent banner");
                    return;
                }
            }
        }
    }

    async fn trigger_lazy_load(&self, page: &spider_chrome::Page) {
        let scroll_amount = 200 + fastrand::u32(..800);
        let script = format!("window.scrollBy(0, {scroll_amount});");
        if let Err(err) = page.evaluate(script.as_str()).await {
            warn!(error = %err, "lazy-load scroll evaluation failed");
        }
    }
}
