//! The extraction ladder (C4): site-specific → generic → paragraph fallback.

use krant_types::error::{KrantError, Result};
use scraper::{Html, Selector};
use tracing::debug;

use crate::sanitize::{collapse_whitespace, looks_like_navigation};
use crate::site_selectors::selectors_for_domain;

const MIN_CONTENT_CHARS: usize = 200;
const MIN_PARAGRAPH_CHARS: usize = 50;

const GENERIC_SELECTORS: &[&str] =
    &["article", ".article-content", "main article", "[itemprop='articleBody']", ".post-content"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    SiteSpecific,
    Generic,
    ParagraphFallback,
}

#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub strategy: ExtractionStrategy,
}

/// Run the ladder against `html` for `domain`, returning the first rung that
/// produces at least [`MIN_CONTENT_CHARS`] characters of cleaned text.
pub fn extract(html: &str, domain: &str) -> Result<ExtractedContent> {
    let document = Html::parse_document(html);

    if let Some(selectors) = selectors_for_domain(domain) {
        if let Some(text) = try_selectors(&document, selectors) {
            debug!(domain, strategy = "site_specific", len = text.len(), "extraction rung matched");
            return finish(text, ExtractionStrategy::SiteSpecific);
        }
    }

    if let Some(text) = try_selectors(&document, GENERIC_SELECTORS) {
        debug!(domain, strategy = "generic", len = text.len(), "extraction rung matched");
        return finish(text, ExtractionStrategy::Generic);
    }

    let paragraph_text = paragraph_fallback(&document);
    debug!(domain, strategy = "paragraph_fallback", len = paragraph_text.len(), "extraction rung matched");
    finish(paragraph_text, ExtractionStrategy::ParagraphFallback)
}

fn finish(text: String, strategy: ExtractionStrategy) -> Result<ExtractedContent> {
    let cleaned = collapse_whitespace(&text);
    if cleaned.chars().count() < MIN_CONTENT_CHARS {
        return Err(KrantError::NoContent);
    }
    Ok(ExtractedContent { text: cleaned, strategy })
}

fn try_selectors(document: &Html, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else { continue };
        let text: String = document
            .select(&selector)
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");
        let cleaned = collapse_whitespace(&text);
        if !cleaned.is_empty() {
            return Some(cleaned);
        }
    }
    None
}

fn paragraph_fallback(document: &Html) -> String {
    let selector = Selector::parse("p").expect("'p' is a valid selector");
    document
        .select(&selector)
        .filter_map(|el| {
            let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if text.len() > MIN_PARAGRAPH_CHARS && !looks_like_navigation(&text) {
                Some(text)
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_selector_wins_when_no_site_override() {
        let html = r#"<html><body><article><p>
            This article body is long enough to clear the two hundred character minimum threshold that the extractor enforces before declaring success, so this rung should win outright.
        </p></article></body></html>"#;
        let extracted = extract(html, "unknown-site.example").unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::Generic);
    }

    #[test]
    fn short_body_yields_no_content() {
        let html = "<html><body><article><p>Too short.</p></article></body></html>";
        let err = extract(html, "unknown-site.example").unwrap_err();
        assert!(matches!(err, KrantError::NoContent));
    }

    #[test]
    fn paragraph_fallback_filters_navigation_fragments() {
        let html = r#"<html><body>
            <div id="app">
                <p>Home</p>
                <p>Nieuws Sport Economie</p>
                <p>
                This is a genuinely long paragraph of article prose that should survive the navigation filter because it contains enough distinct words and characters to look like real content rather than a menu, repeated enough to clear two hundred characters comfortably with room to spare for good measure.
                </p>
            </div>
        </body></html>"#;
        let extracted = extract(html, "unknown-site.example").unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::ParagraphFallback);
        assert!(!extracted.text.contains("Nieuws Sport"));
    }

    #[test]
    fn boundary_199_vs_200_chars() {
        let body_199 = "x".repeat(199);
        let body_200 = "x".repeat(200);
        let html_199 = format!("<html><body><article><p>{body_199}</p></article></body></html>");
        let html_200 = format!("<html><body><article><p>{body_200}</p></article></body></html>");
        assert!(extract(&html_199, "unknown-site.example").is_err());
        assert!(extract(&html_200, "unknown-site.example").is_ok());
    }
}
