//! Lightweight handle metadata for a pooled headless browser context (C5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserHealth {
    Healthy,
    Degraded,
    Dead,
}

/// Metadata about one slot in the browser pool. The actual CDP connection
/// lives in `krant-headless`; this is the part of its state worth exposing
/// across crate boundaries (e.g. for metrics or job attribution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserHandle {
    pub id: Uuid,
    pub health: BrowserHealth,
    pub pages_rendered: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl BrowserHandle {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            health: BrowserHealth::Healthy,
            pages_rendered: 0,
            created_at,
            last_used_at: None,
        }
    }

    pub fn record_use(&mut self, at: DateTime<Utc>) {
        self.pages_rendered += 1;
        self.last_used_at = Some(at);
    }

    /// Whether this instance has exceeded a recycle threshold.
    pub fn should_recycle(&self, max_pages: u64) -> bool {
        self.health != BrowserHealth::Healthy || self.pages_rendered >= max_pages
    }
}
