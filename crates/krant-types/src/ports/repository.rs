//! The repository port consumed by `krant-scraper` and `krant-workers` (§6).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::article::{Article, ArticleDraft};
use crate::error::Result;
use crate::job::{JobState, ScrapingJob};
use crate::source::Source;

/// Storage contract for articles, sources, and scraping jobs. Adapters own
/// the actual database; this crate only describes the shape of the calls
/// the pipeline needs.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Existence by URL for every draft URL in one call (§6: "single call,
    /// any size; implementation batches"), not one round trip per draft.
    /// Content-hash collisions are left to `insert_articles`'s own
    /// `ON CONFLICT DO NOTHING`, since §6 names no separate by-hash check.
    async fn exists_by_url(&self, urls: &[String]) -> Result<HashMap<String, bool>>;

    /// Insert drafts that survived dedup, returning the number actually inserted.
    async fn insert_articles(&self, drafts: &[ArticleDraft]) -> Result<u64>;

    /// Articles awaiting enrichment, oldest first, capped at `limit`.
    async fn get_unenriched(&self, limit: u32) -> Result<Vec<Article>>;

    /// Articles with `content_extracted=false`, oldest first, capped at
    /// `limit` — the batch C7 draws from on its own ticker.
    async fn get_needing_content(&self, limit: u32) -> Result<Vec<Article>>;

    async fn get_article(&self, article_id: i64) -> Result<Article>;

    async fn update_enrichment(&self, article: &Article) -> Result<()>;

    async fn update_content(&self, article_id: i64, content: &str, extracted_at: DateTime<Utc>) -> Result<()>;

    async fn update_stock_data(&self, article_id: i64, article: &Article) -> Result<()>;

    async fn create_job(&self, job: &ScrapingJob) -> Result<i64>;

    async fn start_job(&self, job_id: i64, at: DateTime<Utc>) -> Result<()>;

    async fn complete_job(&self, job_id: i64, job: &ScrapingJob) -> Result<()>;

    async fn fail_job(&self, job_id: i64, job: &ScrapingJob) -> Result<()>;

    async fn job_state(&self, job_id: i64) -> Result<JobState>;

    async fn list_active_sources(&self) -> Result<Vec<Source>>;

    async fn update_source_metadata(&self, source: &Source) -> Result<()>;

    /// Refresh any materialized analytics (e.g. trending keywords) derived
    /// from recently enriched articles. A no-op for adapters without one.
    async fn refresh_analytics(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRepo;

    #[async_trait]
    impl ArticleRepository for NoopRepo {
        async fn exists_by_url(&self, urls: &[String]) -> Result<HashMap<String, bool>> {
            Ok(urls.iter().map(|u| (u.clone(), false)).collect())
        }
        async fn insert_articles(&self, drafts: &[ArticleDraft]) -> Result<u64> {
            Ok(drafts.len() as u64)
        }
        async fn get_unenriched(&self, _limit: u32) -> Result<Vec<Article>> {
            Ok(vec![])
        }
        async fn get_needing_content(&self, _limit: u32) -> Result<Vec<Article>> {
            Ok(vec![])
        }
        async fn get_article(&self, _article_id: i64) -> Result<Article> {
            unreachable!("not exercised by default_refresh_analytics_is_noop")
        }
        async fn update_enrichment(&self, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn update_content(&self, _article_id: i64, _content: &str, _extracted_at: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
        async fn update_stock_data(&self, _article_id: i64, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn create_job(&self, _job: &ScrapingJob) -> Result<i64> {
            Ok(1)
        }
        async fn start_job(&self, _job_id: i64, _at: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
        async fn complete_job(&self, _job_id: i64, _job: &ScrapingJob) -> Result<()> {
            Ok(())
        }
        async fn fail_job(&self, _job_id: i64, _job: &ScrapingJob) -> Result<()> {
            Ok(())
        }
        async fn job_state(&self, _job_id: i64) -> Result<JobState> {
            Ok(JobState::Completed)
        }
        async fn list_active_sources(&self) -> Result<Vec<Source>> {
            Ok(vec![])
        }
        async fn update_source_metadata(&self, _source: &Source) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_refresh_analytics_is_noop() {
        let repo = NoopRepo;
        assert!(repo.refresh_analytics().await.is_ok());
    }
}
