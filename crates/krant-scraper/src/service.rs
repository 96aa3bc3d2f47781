//! Scraping Service (C8): per-source RSS scrape with rate limiting, circuit
//! breaking, batch dedup/insert, and job lifecycle tracking; `scrape_all_sources`
//! fans out over active sources bounded by `max_concurrent`, containing panics
//! at the per-source task boundary per the "safe task" pattern (§9, §10.2).
//! Also exposes `enrich_article_content`, `get_stats`, and `health` (§6).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use krant_config::ScraperConfig;
use krant_fetch::Fetcher;
use krant_headless::{BrowserExtractor, PoolStats};
use krant_reliability::{CircuitBreakerRegistry, CircuitState, RateLimiterRegistry};
use krant_types::error::{ErrorCode, KrantError, Result};
use krant_types::ports::ArticleRepository;
use krant_types::{ScrapingJob, ScrapingMethod, Source};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::orchestrator::ContentOrchestrator;

struct ScrapeCounts {
    found: u32,
    new: u32,
    skipped: u32,
}

/// Per-source counters surfaced by `get_stats()`.
#[derive(Debug, Clone)]
pub struct SourceStats {
    pub domain: String,
    pub total_articles_scraped: u64,
    pub consecutive_failures: u32,
    pub last_scraped_at: Option<chrono::DateTime<Utc>>,
    pub last_success_at: Option<chrono::DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Snapshot of scraper-wide state: per-source counters, circuit states,
/// browser pool occupancy, and which domains carry an active rate-limit slot.
#[derive(Debug, Clone, Default)]
pub struct ScraperStats {
    pub sources: Vec<SourceStats>,
    pub circuits: HashMap<String, CircuitState>,
    pub browser: Option<PoolStats>,
    pub rate_limited_domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
}

/// `health()`'s report. Cache availability is out of scope here: this
/// service holds no reference to a cache backend, so that signal belongs to
/// whatever embeds this service alongside `krant-cache`.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub state: HealthState,
    pub reasons: Vec<String>,
}

pub struct ScrapingService<R: ArticleRepository> {
    repo: Arc<R>,
    fetcher: Arc<Fetcher>,
    circuits: Arc<CircuitBreakerRegistry>,
    rate_limiters: Arc<RateLimiterRegistry>,
    config: ScraperConfig,
    content: Arc<ContentOrchestrator>,
}

impl<R: ArticleRepository + 'static> ScrapingService<R> {
    pub fn new(
        repo: Arc<R>,
        fetcher: Arc<Fetcher>,
        circuits: Arc<CircuitBreakerRegistry>,
        rate_limiters: Arc<RateLimiterRegistry>,
        config: ScraperConfig,
        browser: Option<Arc<BrowserExtractor>>,
    ) -> Self {
        let content = Arc::new(ContentOrchestrator::new(fetcher.clone(), browser, circuits.clone()));
        Self { repo, fetcher, circuits, rate_limiters, config, content }
    }

    /// Scrape one source end to end, tracking a `ScrapingJob` throughout.
    /// Never propagates an error: failures are recorded on the job and on
    /// the source's own failure counters instead.
    pub async fn scrape_source(&self, mut source: Source) -> ScrapingJob {
        let mut job = ScrapingJob::new(source.domain.clone(), ScrapingMethod::Rss);

        let job_id = match self.repo.create_job(&job).await {
            Ok(id) => id,
            Err(err) => {
                error!(source = %source.domain, error = %err, "failed to create scraping job record");
                job.fail(err.code(), err.to_string(), Utc::now());
                return job;
            }
        };
        job.id = job_id;

        let started_at = Utc::now();
        job.start(started_at);
        if let Err(err) = self.repo.start_job(job_id, started_at).await {
            error!(source = %source.domain, error = %err, "failed to mark job running");
        }

        match self.run_scrape_body(&source).await {
            Ok(counts) => {
                let finished_at = Utc::now();
                job.articles_found = counts.found;
                job.articles_new = counts.new;
                job.articles_updated = 0;
                job.articles_skipped = counts.skipped;
                job.complete(finished_at);
                source.record_success(counts.new as u64, finished_at);

                if let Err(err) = self.repo.complete_job(job_id, &job).await {
                    error!(source = %source.domain, error = %err, "failed to persist completed job");
                }
                if let Err(err) = self.repo.update_source_metadata(&source).await {
                    error!(source = %source.domain, error = %err, "failed to persist source metadata");
                }
                info!(
                    source = %source.domain,
                    found = counts.found,
                    new = counts.new,
                    skipped = counts.skipped,
                    "scrape completed"
                );
            }
            Err(err) => {
                let finished_at = Utc::now();
                job.fail(err.code(), err.to_string(), finished_at);
                source.record_failure(err.to_string(), finished_at);

                if let Err(update_err) = self.repo.fail_job(job_id, &job).await {
                    error!(source = %source.domain, error = %update_err, "failed to persist failed job");
                }
                if let Err(update_err) = self.repo.update_source_metadata(&source).await {
                    error!(source = %source.domain, error = %update_err, "failed to persist source metadata");
                }
                error!(source = %source.domain, error = %err, code = %err.code(), "scrape failed");
            }
        }

        job
    }

    async fn run_scrape_body(&self, source: &Source) -> Result<ScrapeCounts> {
        self.rate_limiters.acquire(&source.domain, source.rate_limit_seconds).await;

        let breaker = self.circuits.get_or_create(&source.domain);
        let feed_text = self.fetcher.fetch_text(&source.feed_url, &breaker).await?;

        let mut drafts = krant_feed::parse_feed(feed_text.as_bytes(), &source.name)?;
        let cap = self.config.max_articles_per_scrape as usize;
        if drafts.len() > cap {
            drafts.truncate(cap);
        }
        let found = drafts.len() as u32;

        // Batch-check existence in one call (§6: "single call, any size").
        // Content-hash collisions are left to insert_articles's own
        // ON CONFLICT DO NOTHING as the final backstop.
        let urls: Vec<String> = drafts.iter().map(|d| d.url.clone()).collect();
        let existing = self.repo.exists_by_url(&urls).await?;

        let mut candidates = Vec::with_capacity(drafts.len());
        let mut skipped = 0u32;
        for draft in drafts {
            if existing.get(&draft.url).copied().unwrap_or(false) {
                skipped += 1;
            } else {
                candidates.push(draft);
            }
        }

        let attempted = candidates.len() as u64;
        let inserted = self.repo.insert_articles(&candidates).await?;
        // insert_articles applies ON CONFLICT DO NOTHING as a final backstop
        // against races with a concurrent scrape of the same source/url.
        skipped += (attempted - inserted) as u32;

        Ok(ScrapeCounts { found, new: inserted as u32, skipped })
    }

    /// Scrape every active source concurrently, bounded by
    /// `scraper.max_concurrent`. One source's failure never aborts the rest;
    /// a panicked scrape task is converted into a `Panic`-coded job result.
    pub async fn scrape_all_sources(self: &Arc<Self>) -> Vec<ScrapingJob> {
        let sources = match self.repo.list_active_sources().await {
            Ok(sources) => sources,
            Err(err) => {
                error!(error = %err, "failed to list active sources");
                return Vec::new();
            }
        };

        let mut set: JoinSet<ScrapingJob> = JoinSet::new();
        let mut results = Vec::with_capacity(sources.len());

        for source in sources {
            let service = self.clone();
            set.spawn(async move { service.scrape_source(source).await });

            if set.len() >= self.config.max_concurrent {
                if let Some(joined) = set.join_next().await {
                    results.push(Self::resolve_join(joined));
                }
            }
        }

        while let Some(joined) = set.join_next().await {
            results.push(Self::resolve_join(joined));
        }

        results
    }

    /// Extract and persist body content for one already-scraped article
    /// (C7, on demand rather than on C7's own ticker). The RSS summary
    /// remains authoritative if this fails.
    pub async fn enrich_article_content(&self, article_id: i64) -> Result<()> {
        let article = self.repo.get_article(article_id).await?;

        let sources = self.repo.list_active_sources().await?;
        let Some(source) = sources.into_iter().find(|s| s.name == article.source) else {
            debug!(article_id, source = %article.source, "no active source config for article; skipping content extraction");
            return Err(KrantError::NoContent);
        };

        let extracted = self.content.extract(&source, &article.url).await?;
        self.repo.update_content(article_id, &extracted.content, Utc::now()).await?;
        Ok(())
    }

    /// Snapshot per-source counters, circuit states, browser occupancy, and
    /// rate-limited domains for observability.
    pub async fn get_stats(&self) -> ScraperStats {
        let sources = match self.repo.list_active_sources().await {
            Ok(sources) => sources
                .into_iter()
                .map(|s| SourceStats {
                    domain: s.domain,
                    total_articles_scraped: s.total_articles_scraped,
                    consecutive_failures: s.consecutive_failures,
                    last_scraped_at: s.last_scraped_at,
                    last_success_at: s.last_success_at,
                    last_error: s.last_error,
                })
                .collect(),
            Err(err) => {
                error!(error = %err, "failed to list active sources for stats");
                Vec::new()
            }
        };

        ScraperStats {
            sources,
            circuits: self.circuits.states().await,
            browser: self.content.browser_stats(),
            rate_limited_domains: self.rate_limiters.tracked_domains(),
        }
    }

    /// `degraded` when any circuit is open, the browser pool is closed, or a
    /// source has exceeded the circuit's consecutive-failure threshold (§7).
    pub async fn health(&self) -> HealthReport {
        let mut reasons = Vec::new();

        let circuit_states = self.circuits.states().await;
        if circuit_states.values().any(|s| *s == CircuitState::Open) {
            reasons.push("one or more circuits are open".to_string());
        }

        if let Some(stats) = self.content.browser_stats() {
            if stats.closed {
                reasons.push("browser pool is closed".to_string());
            }
        }

        let threshold = self.circuits.failure_threshold();
        match self.repo.list_active_sources().await {
            Ok(sources) => {
                if sources.iter().any(|s| s.consecutive_failures >= threshold) {
                    reasons.push("a source has exceeded the consecutive-failure threshold".to_string());
                }
            }
            Err(err) => {
                reasons.push(format!("failed to list active sources: {err}"));
            }
        }

        let state = if reasons.is_empty() { HealthState::Healthy } else { HealthState::Degraded };
        HealthReport { state, reasons }
    }

    fn resolve_join(joined: std::result::Result<ScrapingJob, JoinError>) -> ScrapingJob {
        match joined {
            Ok(job) => job,
            Err(join_err) => {
                let mut job = ScrapingJob::new("unknown", ScrapingMethod::Rss);
                let now = Utc::now();
                if join_err.is_panic() {
                    error!(error = %join_err, "scrape task panicked");
                    job.fail(ErrorCode::Panic, format!("scrape task panicked: {join_err}"), now);
                } else {
                    job.fail(ErrorCode::Cancelled, join_err.to_string(), now);
                }
                job
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use krant_types::article::{Article, ArticleDraft};
    use krant_types::job::JobState;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// An in-memory repository that pre-seeds a set of "already known" URLs,
    /// exercising the dedup path independent of any real storage adapter.
    struct FakeRepo {
        known_urls: HashSet<String>,
        inserted: Mutex<Vec<ArticleDraft>>,
    }

    #[async_trait]
    impl ArticleRepository for FakeRepo {
        async fn exists_by_url(&self, urls: &[String]) -> Result<HashMap<String, bool>> {
            Ok(urls.iter().map(|u| (u.clone(), self.known_urls.contains(u))).collect())
        }
        async fn insert_articles(&self, drafts: &[ArticleDraft]) -> Result<u64> {
            let mut inserted = self.inserted.lock().unwrap();
            inserted.extend(drafts.iter().cloned());
            Ok(drafts.len() as u64)
        }
        async fn get_unenriched(&self, _limit: u32) -> Result<Vec<Article>> {
            Ok(vec![])
        }
        async fn get_needing_content(&self, _limit: u32) -> Result<Vec<Article>> {
            Ok(vec![])
        }
        async fn get_article(&self, _article_id: i64) -> Result<Article> {
            unreachable!("not exercised by these tests")
        }
        async fn update_enrichment(&self, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn update_content(
            &self,
            _article_id: i64,
            _content: &str,
            _extracted_at: chrono::DateTime<Utc>,
        ) -> Result<()> {
            Ok(())
        }
        async fn update_stock_data(&self, _article_id: i64, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn create_job(&self, _job: &ScrapingJob) -> Result<i64> {
            Ok(1)
        }
        async fn start_job(&self, _job_id: i64, _at: chrono::DateTime<Utc>) -> Result<()> {
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

    const SAMPLE_RSS_10_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>NU.nl</title>
<item><title>Item 1</title><link>https://nu.nl/1</link></item>
<item><title>Item 2</title><link>https://nu.nl/2</link></item>
<item><title>Item 3</title><link>https://nu.nl/3</link></item>
<item><title>Item 4</title><link>https://nu.nl/4</link></item>
<item><title>Item 5</title><link>https://nu.nl/5</link></item>
<item><title>Item 6</title><link>https://nu.nl/6</link></item>
<item><title>Item 7</title><link>https://nu.nl/7</link></item>
<item><title>Item 8</title><link>https://nu.nl/8</link></item>
<item><title>Item 9</title><link>https://nu.nl/9</link></item>
<item><title>Item 10</title><link>https://nu.nl/10</link></item>
</channel></rss>"#;

    #[test]
    fn dedup_counts_match_seed_scenario_s1() {
        // Mirrors S1: 10 items, 2 pre-seeded as already known by URL.
        let drafts = krant_feed::parse_feed(SAMPLE_RSS_10_ITEMS.as_bytes(), "nu.nl").unwrap();
        assert_eq!(drafts.len(), 10);

        let mut known = HashSet::new();
        known.insert("https://nu.nl/3".to_string());
        known.insert("https://nu.nl/7".to_string());

        let mut new_count = 0u32;
        let mut skipped = 0u32;
        for draft in &drafts {
            if known.contains(&draft.url) {
                skipped += 1;
            } else {
                new_count += 1;
            }
        }

        assert_eq!(drafts.len() as u32, 10);
        assert_eq!(new_count, 8);
        assert_eq!(skipped, 2);
    }

    #[tokio::test]
    async fn fake_repo_insert_records_drafts_and_respects_existing_urls_batched() {
        let mut known = HashSet::new();
        known.insert("https://nu.nl/3".to_string());
        let repo = FakeRepo { known_urls: known, inserted: Mutex::new(Vec::new()) };

        let urls = vec!["https://nu.nl/3".to_string(), "https://nu.nl/99".to_string()];
        let existing = repo.exists_by_url(&urls).await.unwrap();
        assert_eq!(existing.get("https://nu.nl/3"), Some(&true));
        assert_eq!(existing.get("https://nu.nl/99"), Some(&false));

        let draft = ArticleDraft {
            url: "https://nu.nl/99".into(),
            content_hash: "h".into(),
            title: "t".into(),
            summary: None,
            published: Utc::now(),
            source: "nu.nl".into(),
            author: None,
            category: None,
            keywords: vec![],
            image_url: None,
        };
        let inserted = repo.insert_articles(std::slice::from_ref(&draft)).await.unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(repo.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn join_error_panic_is_classified_as_panic_code() {
        let handle = tokio::spawn(async { panic!("boom") });
        let joined = handle.await;
        let job = ScrapingService::<FakeRepo>::resolve_join(joined);
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_code, Some(ErrorCode::Panic));
    }

    #[tokio::test]
    async fn health_is_healthy_with_no_sources_and_no_open_circuits() {
        let repo = Arc::new(FakeRepo { known_urls: HashSet::new(), inserted: Mutex::new(Vec::new()) });
        let fetcher = Arc::new(krant_fetch::Fetcher::new(krant_fetch::RetryConfig::default()).unwrap());
        let circuits = Arc::new(CircuitBreakerRegistry::new(krant_config::CircuitConfig::default()));
        let rate_limiters = Arc::new(RateLimiterRegistry::new());
        let service = ScrapingService::new(
            repo,
            fetcher,
            circuits,
            rate_limiters,
            ScraperConfig::default(),
            None,
        );

        let report = service.health().await;
        assert_eq!(report.state, HealthState::Healthy);
        assert!(report.reasons.is_empty());
    }
}
