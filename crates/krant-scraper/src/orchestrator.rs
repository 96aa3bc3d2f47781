//! Content Orchestrator (C7): RSS summary is already in hand by the time this
//! runs; this fills in `content` via C4 (HTTP + selectors), falling back to
//! C6 (headless browser) only when C4 comes back empty or unparsable.

use std::sync::Arc;

use krant_fetch::Fetcher;
use krant_headless::{BrowserExtractor, PoolStats};
use krant_reliability::CircuitBreakerRegistry;
use krant_types::error::{ErrorCode, KrantError, Result};
use krant_types::{ScrapingMethod, Source};
use tracing::{debug, warn};

/// Extraction errors that plausibly mean "the page has content, this fetch
/// path just couldn't reach it" — worth retrying through the browser.
fn worth_falling_back(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::NoContent
            | ErrorCode::Parse
            | ErrorCode::Network
            | ErrorCode::Timeout
            | ErrorCode::Http4xx
            | ErrorCode::Http5xx
            | ErrorCode::Decode
    )
}

pub struct ExtractedArticle {
    pub content: String,
    pub method: ScrapingMethod,
}

pub struct ContentOrchestrator {
    fetcher: Arc<Fetcher>,
    browser: Option<Arc<BrowserExtractor>>,
    circuits: Arc<CircuitBreakerRegistry>,
}

impl ContentOrchestrator {
    pub fn new(
        fetcher: Arc<Fetcher>,
        browser: Option<Arc<BrowserExtractor>>,
        circuits: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        Self { fetcher, browser, circuits }
    }

    /// Browser pool occupancy, when the browser fallback is configured.
    pub fn browser_stats(&self) -> Option<PoolStats> {
        self.browser.as_ref().map(|b| b.pool_stats())
    }

    /// Extract article body content for `url`, belonging to `source`.
    ///
    /// Callers must never overwrite previously extracted content with the
    /// `Err` case: on failure the RSS summary remains authoritative.
    pub async fn extract(&self, source: &Source, url: &str) -> Result<ExtractedArticle> {
        if !source.allowed {
            return Err(KrantError::NotAllowed(source.domain.clone()));
        }

        let breaker = self.circuits.get_or_create(&source.domain);
        let html_attempt = match self.fetcher.fetch_text(url, &breaker).await {
            Ok(html) => krant_html::extract(&html, &source.domain).map(|e| e.text),
            Err(err) => Err(err),
        };

        match html_attempt {
            Ok(content) => Ok(ExtractedArticle { content, method: ScrapingMethod::Html }),
            Err(err) if worth_falling_back(err.code()) => {
                let Some(browser) = &self.browser else {
                    debug!(url, "html extraction failed and browser fallback disabled");
                    return Err(err);
                };
                warn!(url, error = %err, "html extraction failed, falling back to browser");
                let rendered = browser.extract(url, &source.domain).await?;
                Ok(ExtractedArticle { content: rendered.text, method: ScrapingMethod::Browser })
            }
            Err(err) => Err(err),
        }
    }
}
