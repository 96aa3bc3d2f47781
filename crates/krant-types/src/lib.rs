//! Shared data model, error vocabulary, and port traits for the ingestion
//! and enrichment pipeline. Every other crate in the workspace depends on
//! this one; it depends on nothing else in the workspace.

pub mod article;
pub mod browser;
pub mod cache;
pub mod error;
pub mod job;
pub mod ports;
pub mod source;

pub use article::{Article, ArticleDraft, EntitySet, Keyword, SentimentLabel, StockQuote, StockTicker};
pub use browser::{BrowserHandle, BrowserHealth};
pub use cache::CacheEntry;
pub use error::{ErrorCode, KrantError, Result};
pub use job::{JobState, ScrapingJob, ScrapingMethod};
pub use source::Source;
