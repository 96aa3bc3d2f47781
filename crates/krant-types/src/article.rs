//! The `Article` entity and its enrichment sub-structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentiment label bucket derived from `ai_sentiment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Bucket a raw score in `[-1, 1]` into a label.
    pub fn from_score(score: f32) -> Self {
        if score > 0.15 {
            SentimentLabel::Positive
        } else if score < -0.15 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// A single extracted keyword with its relevance score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub score: f32,
}

/// A stock ticker mentioned in an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTicker {
    pub symbol: String,
    pub company_name: Option<String>,
    pub relevance: Option<f32>,
}

/// Grouped named entities recognized in an article, regardless of which
/// wire shape the LLM used to encode them (see `krant_workers`'s entity
/// parser, which reduces either shape down to this struct).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    pub persons: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub stock_tickers: Vec<StockTicker>,
}

/// A point-in-time stock quote snapshot, opaque beyond what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change_percent: f64,
    pub as_of: DateTime<Utc>,
}

/// The unit of aggregation: one news item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub content_hash: String,

    pub title: String,
    pub summary: Option<String>,
    pub published: DateTime<Utc>,
    pub source: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    pub image_url: Option<String>,

    pub content: Option<String>,
    pub content_extracted: bool,
    pub content_extracted_at: Option<DateTime<Utc>>,

    pub ai_processed: bool,
    pub ai_processed_at: Option<DateTime<Utc>>,
    pub ai_error: Option<String>,
    pub ai_sentiment: Option<f32>,
    pub ai_sentiment_label: Option<SentimentLabel>,
    pub ai_categories: HashMap<String, f32>,
    pub ai_entities: Option<EntitySet>,
    pub ai_keywords: Vec<Keyword>,
    pub ai_summary: Option<String>,
    pub ai_stock_tickers: Vec<StockTicker>,

    pub stock_data: HashMap<String, StockQuote>,
    pub stock_data_updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// SHA-256 over `title + body + published`, matching the unique
    /// `content_hash` invariant in the data model.
    pub fn compute_content_hash(title: &str, body: &str, published: DateTime<Utc>) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(body.as_bytes());
        hasher.update(published.timestamp().to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Invariant check: `ai_processed=true` implies either an error or a
    /// fully populated enrichment payload.
    pub fn enrichment_is_consistent(&self) -> bool {
        if !self.ai_processed {
            return true;
        }
        self.ai_error.is_some()
            || (self.ai_sentiment.is_some()
                && !self.ai_categories.is_empty()
                && self.ai_entities.is_some()
                && !self.ai_keywords.is_empty())
    }

    /// Invariant check: `content_extracted=true` implies non-empty UTF-8 content.
    pub fn content_is_consistent(&self) -> bool {
        if !self.content_extracted {
            return true;
        }
        matches!(&self.content, Some(c) if !c.is_empty())
    }
}

/// A not-yet-persisted article, as produced by the feed parser (C3) before
/// the repository assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub url: String,
    pub content_hash: String,
    pub title: String,
    pub summary: Option<String>,
    pub published: DateTime<Utc>,
    pub source: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_bucketing() {
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.5), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn content_hash_is_deterministic() {
        let now = Utc::now();
        let a = Article::compute_content_hash("t", "b", now);
        let b = Article::compute_content_hash("t", "b", now);
        assert_eq!(a, b);
        let c = Article::compute_content_hash("t2", "b", now);
        assert_ne!(a, c);
    }
}
