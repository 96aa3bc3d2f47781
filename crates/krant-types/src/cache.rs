//! The cache envelope stored behind a [`crate::ports::cache::CacheStorage`] (C11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque cached payload plus the staleness bookkeeping SWR needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub compressed: bool,
    pub expires_at: DateTime<Utc>,
    /// Set when a stale-while-revalidate window applies; `None` means no
    /// grace period beyond `expires_at`.
    pub stale_until: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(value: Vec<u8>, compressed: bool, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            compressed,
            expires_at,
            stale_until: None,
        }
    }

    pub fn with_stale_until(mut self, stale_until: DateTime<Utc>) -> Self {
        self.stale_until = Some(stale_until);
        self
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Fresh entries and entries inside their SWR grace window are both
    /// servable; only the fresh/stale distinction differs for the caller.
    pub fn is_servable(&self, now: DateTime<Utc>) -> bool {
        self.is_fresh(now) || self.stale_until.map(|until| now < until).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stale_window_extends_servability() {
        let now = Utc::now();
        let entry = CacheEntry::new(vec![1, 2, 3], false, now - Duration::seconds(1))
            .with_stale_until(now + Duration::seconds(30));
        assert!(!entry.is_fresh(now));
        assert!(entry.is_servable(now));
    }
}
