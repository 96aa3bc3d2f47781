//! Enrichment Worker Pool (C9): periodic LLM-driven article analysis with
//! adaptive pacing, tolerant entity parsing, and per-article panic
//! containment via the "safe task" pattern (§9, §10.2).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use krant_config::EnrichmentConfig;
use krant_types::article::Article;
use krant_types::ports::{ArticleRepository, LlmClient};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::budget::BudgetTracker;
use crate::entities;
use crate::stock::StockEnrichHook;

const SYSTEM_PROMPT: &str = concat!(
    "You analyze Dutch news articles. Respond with a single JSON object only, ",
    "no prose, shaped as: {\"sentiment\": {\"score\": <-1..1>, \"label\": <string>}, ",
    "\"categories\": {<name>: <0..1>, ...}, ",
    "\"entities\": {\"persons\": [string], \"organizations\": [string], ",
    "\"locations\": [string], \"stock_tickers\": [{\"symbol\": string, ",
    "\"company_name\": string?, \"relevance\": number?}]}, ",
    "\"keywords\": [{\"word\": string, \"score\": <0..1>}], \"summary\": string?}",
);

/// The overfetched candidate window used purely to estimate backlog depth
/// for adaptive pacing (§9 design note). `ArticleRepository::get_unenriched`
/// takes only a limit, with no separate count query in the port (§6), so
/// this crate over-fetches once and slices the batch it actually processes
/// from the same result — one call serves both purposes.
const BACKLOG_PROBE_LIMIT: u32 = 100;

#[derive(Debug, Default)]
pub struct EnrichmentTickStats {
    pub queue_len_estimate: usize,
    pub processed: usize,
    pub paused_for_budget: bool,
}

/// Runtime-observable snapshot surfaced by `stats()` (§6).
#[derive(Debug, Clone)]
pub struct EnrichmentStats {
    pub is_running: bool,
    pub runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub interval_min: u64,
}

pub struct EnrichmentWorkerPool<R: ArticleRepository, L: LlmClient> {
    repo: Arc<R>,
    llm: Arc<L>,
    config: EnrichmentConfig,
    budget: BudgetTracker,
    stock_hook: Option<Arc<dyn StockEnrichHook>>,
    is_running: AtomicBool,
    runs: AtomicU64,
    last_run: Mutex<Option<DateTime<Utc>>>,
    current_interval_min: AtomicU64,
    trigger: Notify,
}

impl<R: ArticleRepository + 'static, L: LlmClient + 'static> EnrichmentWorkerPool<R, L> {
    pub fn new(
        repo: Arc<R>,
        llm: Arc<L>,
        config: EnrichmentConfig,
        stock_hook: Option<Arc<dyn StockEnrichHook>>,
    ) -> Self {
        let budget = BudgetTracker::new(config.daily_budget_usd);
        let current_interval_min = AtomicU64::new(config.interval_min.max(1));
        Self {
            repo,
            llm,
            config,
            budget,
            stock_hook,
            is_running: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            last_run: Mutex::new(None),
            current_interval_min,
            trigger: Notify::new(),
        }
    }

    /// Wake the pool's `run()` loop immediately rather than waiting for the
    /// adaptive interval to elapse. A no-op if `run()` isn't currently awaiting.
    pub fn trigger_now(&self) {
        self.trigger.notify_one();
    }

    /// Runtime-observable snapshot: whether a tick is in flight, how many
    /// ticks have run, when the last one finished, and the current interval.
    pub async fn stats(&self) -> EnrichmentStats {
        EnrichmentStats {
            is_running: self.is_running.load(Ordering::SeqCst),
            runs: self.runs.load(Ordering::SeqCst),
            last_run: *self.last_run.lock().await,
            interval_min: self.current_interval_min.load(Ordering::SeqCst),
        }
    }

    /// Run one enrichment tick: fetch a batch, enrich each article through a
    /// bounded worker pool, then hand off any tickers found to C10. Returns
    /// the backlog estimate driving the next tick's adaptive interval.
    pub async fn run_tick(&self) -> EnrichmentTickStats {
        self.is_running.store(true, Ordering::SeqCst);
        let stats = self.run_tick_inner().await;
        self.runs.fetch_add(1, Ordering::SeqCst);
        *self.last_run.lock().await = Some(Utc::now());
        self.is_running.store(false, Ordering::SeqCst);
        stats
    }

    async fn run_tick_inner(&self) -> EnrichmentTickStats {
        if !self.config.enabled {
            return EnrichmentTickStats::default();
        }
        if !self.budget.is_available().await {
            info!("enrichment pool paused: daily budget exhausted, resumes at next UTC midnight");
            return EnrichmentTickStats { paused_for_budget: true, ..Default::default() };
        }

        let probe = match self.repo.get_unenriched(BACKLOG_PROBE_LIMIT).await {
            Ok(articles) => articles,
            Err(err) => {
                error!(error = %err, "failed to fetch unenriched articles");
                return EnrichmentTickStats::default();
            }
        };
        let queue_len_estimate = probe.len();
        let batch: Vec<Article> = probe.into_iter().take(self.config.batch_size as usize).collect();
        if batch.is_empty() {
            return EnrichmentTickStats { queue_len_estimate, ..Default::default() };
        }

        let mut set: JoinSet<Option<Article>> = JoinSet::new();
        let mut enriched = Vec::with_capacity(batch.len());

        for article in batch {
            let repo = self.repo.clone();
            let llm = self.llm.clone();
            let timeout = Duration::from_secs(self.config.llm_timeout_seconds);
            self.budget.charge_one_call().await;
            set.spawn(async move { Some(process_one(repo, llm, article, timeout).await) });

            if set.len() >= self.config.workers {
                if let Some(article) = Self::drain_one(&mut set).await {
                    enriched.push(article);
                }
            }
        }
        while let Some(article) = Self::drain_one(&mut set).await {
            enriched.push(article);
        }

        let processed = enriched.len();
        let with_tickers: Vec<Article> =
            enriched.into_iter().filter(|a| !a.ai_stock_tickers.is_empty()).collect();

        if let Some(hook) = &self.stock_hook {
            if !with_tickers.is_empty() {
                hook.enrich(with_tickers).await;
            }
        }

        EnrichmentTickStats { queue_len_estimate, processed, paused_for_budget: false }
    }

    async fn drain_one(set: &mut JoinSet<Option<Article>>) -> Option<Article> {
        match set.join_next().await {
            Some(Ok(article)) => article,
            Some(Err(join_err)) => {
                if join_err.is_panic() {
                    error!(error = %join_err, "enrichment worker panicked");
                } else {
                    warn!(error = %join_err, "enrichment worker task cancelled");
                }
                None
            }
            None => None,
        }
    }

    /// Run forever at the adaptive interval until `shutdown` fires, or
    /// immediately whenever `trigger_now()` is called. In-flight ticks are
    /// not aborted on shutdown; the loop simply stops scheduling a new one.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval_min = self.config.interval_min.max(1);
        self.current_interval_min.store(interval_min, Ordering::SeqCst);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval_min * 60)) => {
                    let stats = self.run_tick().await;
                    if !stats.paused_for_budget {
                        interval_min = self.config.adaptive_interval_min(stats.queue_len_estimate).max(1);
                        self.current_interval_min.store(interval_min, Ordering::SeqCst);
                    }
                    debug!(
                        queue_len = stats.queue_len_estimate,
                        processed = stats.processed,
                        next_interval_min = interval_min,
                        "enrichment tick finished"
                    );
                }
                _ = self.trigger.notified() => {
                    info!("enrichment pool triggered on demand");
                    let stats = self.run_tick().await;
                    if !stats.paused_for_budget {
                        interval_min = self.config.adaptive_interval_min(stats.queue_len_estimate).max(1);
                        self.current_interval_min.store(interval_min, Ordering::SeqCst);
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("enrichment pool shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Enrich one article via the LLM, tolerating both parse and provider
/// failures by recording `ai_error` instead of propagating. Always persists,
/// so the article is never retried forever (§4.9).
async fn process_one<R: ArticleRepository, L: LlmClient>(
    repo: Arc<R>,
    llm: Arc<L>,
    mut article: Article,
    timeout: Duration,
) -> Article {
    let article_text = format!("{}\n\n{}", article.title, article.content.as_deref().unwrap_or(""));

    match llm.analyze(SYSTEM_PROMPT, &article_text, timeout).await {
        Ok(raw) => match entities::parse_llm_response(&raw) {
            Ok(parsed) => {
                article.ai_stock_tickers = parsed.entities.stock_tickers.clone();
                article.ai_sentiment = Some(parsed.sentiment_score);
                article.ai_sentiment_label = Some(parsed.sentiment_label);
                article.ai_categories = parsed.categories;
                article.ai_entities = Some(parsed.entities);
                article.ai_keywords = parsed.keywords;
                article.ai_summary = parsed.summary;
                article.ai_error = None;
            }
            Err(err) => {
                warn!(article_id = article.id, error = %err, "llm response parse failed");
                article.ai_error = Some(err.to_string());
            }
        },
        Err(err) => {
            warn!(article_id = article.id, error = %err, provider = llm.provider_name(), "llm call failed");
            article.ai_error = Some(err.to_string());
        }
    }

    article.ai_processed = true;
    article.ai_processed_at = Some(Utc::now());

    if let Err(err) = repo.update_enrichment(&article).await {
        error!(article_id = article.id, error = %err, "failed to persist enrichment");
    }

    article
}
