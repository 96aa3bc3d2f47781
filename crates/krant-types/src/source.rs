//! The `Source` entity: a configured publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub feed_url: String,
    pub active: bool,
    pub rate_limit_seconds: u64,
    pub max_articles_per_scrape: u32,

    /// Hard gate on content extraction (§9 open question: implemented as a
    /// hard gate rather than a soft warning).
    pub allowed: bool,

    pub last_scraped_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub total_articles_scraped: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            domain: domain.into(),
            feed_url: feed_url.into(),
            active: true,
            rate_limit_seconds: 3,
            max_articles_per_scrape: 100,
            allowed: true,
            last_scraped_at: None,
            last_success_at: None,
            total_articles_scraped: 0,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    /// Apply a successful scrape's effects (§3: invariant — resets on success).
    pub fn record_success(&mut self, articles_new: u64, at: DateTime<Utc>) {
        self.last_scraped_at = Some(at);
        self.last_success_at = Some(at);
        self.total_articles_scraped += articles_new;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    /// Apply a failed scrape's effects (§3: invariant — increments on failure).
    pub fn record_failure(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.last_scraped_at = Some(at);
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_then_success_resets_counter() {
        let mut s = Source::new("NU.nl", "nu.nl", "https://nu.nl/rss");
        let t = Utc::now();
        s.record_failure("network", t);
        s.record_failure("network", t);
        assert_eq!(s.consecutive_failures, 2);
        s.record_success(5, t);
        assert_eq!(s.consecutive_failures, 0);
        assert_eq!(s.total_articles_scraped, 5);
        assert!(s.last_error.is_none());
    }
}
