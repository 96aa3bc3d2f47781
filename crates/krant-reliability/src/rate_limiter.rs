//! Per-domain request spacing (C1).
//!
//! Unlike a token bucket, this limiter guarantees a minimum gap between
//! consecutive requests to the same domain rather than a burst budget — the
//! invariant in play is "time between successive acquires ≥ R − ε", not
//! "N requests per window".

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct DomainSlot {
    last_request_at: Mutex<Option<Instant>>,
}

/// Registry of per-domain spacing gates, keyed by domain.
pub struct RateLimiterRegistry {
    slots: DashMap<String, Arc<DomainSlot>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self { slots: DashMap::new() }
    }

    fn get_or_create(&self, domain: &str) -> Arc<DomainSlot> {
        self.slots
            .entry(domain.to_string())
            .or_insert_with(|| {
                Arc::new(DomainSlot {
                    last_request_at: Mutex::new(None),
                })
            })
            .clone()
    }

    /// Block until at least `rate_limit_seconds` have elapsed since the last
    /// acquire for this domain, then record the new acquire time. Honors
    /// cancellation: dropping the returned future before it resolves leaves
    /// no state mutated.
    pub async fn acquire(&self, domain: &str, rate_limit_seconds: u64) {
        let slot = self.get_or_create(domain);
        let mut last = slot.last_request_at.lock().await;

        if let Some(prev) = *last {
            let required = Duration::from_secs(rate_limit_seconds);
            let elapsed = prev.elapsed();
            if elapsed < required {
                let wait = required - elapsed;
                debug!(domain, wait_ms = wait.as_millis(), "rate limiter waiting");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Domains with an active spacing slot, for stats reporting.
    pub fn tracked_domains(&self) -> Vec<String> {
        self.slots.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
