//! The LLM enrichment port consumed by `krant-workers` (C9, §6).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// A provider-agnostic completion call. The worker pool owns prompt
/// construction and response parsing; this trait only crosses the process
/// boundary to whichever model backs it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request a completion for `article_text` using `system_prompt`,
    /// returning the raw response text (expected to be JSON, but parsing is
    /// the caller's responsibility — see the dual entity-encoding tolerant
    /// parser in `krant-workers`).
    async fn analyze(&self, system_prompt: &str, article_text: &str, timeout: Duration) -> Result<String>;

    /// A stable identifier for logging/metrics (e.g. model name).
    fn provider_name(&self) -> &str;
}
