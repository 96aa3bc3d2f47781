//! Enrichment Worker Pool (C9), Stock Enricher (C10), and Scheduler (C12) —
//! the background processors that turn scraped drafts into enriched,
//! stock-annotated articles on an ongoing cadence.

pub mod budget;
pub mod entities;
pub mod enrichment;
pub mod scheduler;
pub mod stock;

pub use enrichment::{EnrichmentStats, EnrichmentTickStats, EnrichmentWorkerPool};
pub use scheduler::Scheduler;
pub use stock::{StockEnrichHook, StockEnricher};

/// Convenience alias for the common deployment: a Redis-backed cache behind
/// the stock enricher's `CacheStorage` bound, matching `krant-cache`'s only
/// production `CacheStorage` implementation.
pub type RedisBackedStockEnricher<R, S> = stock::StockEnricher<R, S, krant_cache::RedisStorage>;
