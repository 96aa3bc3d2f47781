//! Tolerant parsing of the LLM's enrichment JSON (§4.9, §9): the response is
//! modeled as a sum over the two observed entity encodings rather than a
//! fallback chain of type assertions. `serde`'s untagged enum dispatch tries
//! the array form first, then the object form, exactly matching the spec's
//! "attempt the standard form first; on failure, attempt the object form".

use std::collections::HashMap;

use krant_types::article::{EntitySet, Keyword, SentimentLabel, StockTicker};
use krant_types::error::{KrantError, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawSentiment {
    score: f32,
    #[allow(dead_code)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyword {
    word: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct RawStockTicker {
    symbol: String,
    company_name: Option<String>,
    relevance: Option<f32>,
}

impl From<RawStockTicker> for StockTicker {
    fn from(raw: RawStockTicker) -> Self {
        StockTicker { symbol: raw.symbol, company_name: raw.company_name, relevance: raw.relevance }
    }
}

/// One item of the array-of-tagged-object entity encoding.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ArrayEntityItem {
    Person { value: String },
    Organization { value: String },
    Location { value: String },
    StockTicker { symbol: String, company_name: Option<String>, relevance: Option<f32> },
}

/// The bare object-of-lists encoding: field names line up directly with
/// `EntitySet`.
#[derive(Debug, Default, Deserialize)]
struct ObjectEntities {
    #[serde(default)]
    persons: Vec<String>,
    #[serde(default)]
    organizations: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    stock_tickers: Vec<RawStockTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntities {
    Array(Vec<ArrayEntityItem>),
    Object(ObjectEntities),
}

fn reduce_array(items: Vec<ArrayEntityItem>) -> EntitySet {
    let mut set = EntitySet::default();
    for item in items {
        match item {
            ArrayEntityItem::Person { value } => set.persons.push(value),
            ArrayEntityItem::Organization { value } => set.organizations.push(value),
            ArrayEntityItem::Location { value } => set.locations.push(value),
            ArrayEntityItem::StockTicker { symbol, company_name, relevance } => {
                set.stock_tickers.push(StockTicker { symbol, company_name, relevance })
            }
        }
    }
    set
}

fn reduce_object(obj: ObjectEntities) -> EntitySet {
    EntitySet {
        persons: obj.persons,
        organizations: obj.organizations,
        locations: obj.locations,
        stock_tickers: obj.stock_tickers.into_iter().map(Into::into).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct RawEnrichment {
    sentiment: RawSentiment,
    #[serde(default)]
    categories: HashMap<String, f32>,
    entities: serde_json::Value,
    #[serde(default)]
    keywords: Vec<RawKeyword>,
    #[serde(default)]
    summary: Option<String>,
}

/// Successfully parsed and range-clamped enrichment output, ready to be
/// written onto an `Article`.
pub struct ParsedEnrichment {
    pub sentiment_score: f32,
    pub sentiment_label: SentimentLabel,
    pub categories: HashMap<String, f32>,
    pub entities: EntitySet,
    pub keywords: Vec<Keyword>,
    pub summary: Option<String>,
}

/// Parse one LLM completion into [`ParsedEnrichment`]. `Err` means the
/// response was not usable JSON in either entity shape; callers record this
/// as `ai_error` rather than propagating further (§7: C9 never crashes on a
/// bad completion).
pub fn parse_llm_response(raw: &str) -> Result<ParsedEnrichment> {
    let parsed: RawEnrichment =
        serde_json::from_str(raw).map_err(|e| KrantError::Parse(format!("llm response: {e}")))?;

    let raw_entities: RawEntities = serde_json::from_value(parsed.entities)
        .map_err(|e| KrantError::Parse(format!("llm entities: {e}")))?;

    let entities = match raw_entities {
        RawEntities::Array(items) => {
            debug!("parsed llm entities via array form");
            reduce_array(items)
        }
        RawEntities::Object(obj) => {
            debug!("parsed llm entities via object-of-lists fallback form");
            reduce_object(obj)
        }
    };

    let sentiment_score = parsed.sentiment.score.clamp(-1.0, 1.0);
    let categories = parsed.categories.into_iter().map(|(k, v)| (k, v.clamp(0.0, 1.0))).collect();
    let keywords = parsed
        .keywords
        .into_iter()
        .map(|k| Keyword { word: k.word, score: k.score.clamp(0.0, 1.0) })
        .collect();

    Ok(ParsedEnrichment {
        sentiment_score,
        sentiment_label: SentimentLabel::from_score(sentiment_score),
        categories,
        entities,
        keywords,
        summary: parsed.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_form_entities_parse() {
        let raw = r#"{
            "sentiment": {"score": 0.4, "label": "positive"},
            "categories": {"politics": 0.9},
            "entities": [
                {"type": "person", "value": "Mark Rutte"},
                {"type": "organization", "value": "NOS"},
                {"type": "stock_ticker", "symbol": "ASML", "company_name": "ASML Holding", "relevance": 0.8}
            ],
            "keywords": [{"word": "verkiezingen", "score": 0.7}],
            "summary": "A summary."
        }"#;
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed.entities.persons, vec!["Mark Rutte".to_string()]);
        assert_eq!(parsed.entities.organizations, vec!["NOS".to_string()]);
        assert_eq!(parsed.entities.stock_tickers[0].symbol, "ASML");
        assert_eq!(parsed.sentiment_label, SentimentLabel::Positive);
    }

    #[test]
    fn object_form_entities_parse_as_seed_scenario_s5() {
        let raw = r#"{
            "sentiment": {"score": 0.0, "label": "neutral"},
            "categories": {},
            "entities": {"persons": ["A"], "organizations": ["B", "C"]},
            "keywords": []
        }"#;
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed.entities.persons, vec!["A".to_string()]);
        assert_eq!(parsed.entities.organizations, vec!["B".to_string(), "C".to_string()]);
        assert!(parsed.entities.locations.is_empty());
        assert!(parsed.entities.stock_tickers.is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_llm_response("not json").unwrap_err();
        assert_eq!(err.code(), krant_types::error::ErrorCode::Parse);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let raw = r#"{
            "sentiment": {"score": 5.0, "label": "positive"},
            "categories": {"x": 2.0},
            "entities": {"persons": []},
            "keywords": [{"word": "w", "score": -1.0}]
        }"#;
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed.sentiment_score, 1.0);
        assert_eq!(parsed.categories["x"], 1.0);
        assert_eq!(parsed.keywords[0].score, 0.0);
    }
}
