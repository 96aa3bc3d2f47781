//! RSS/Atom bytes → `ArticleDraft` candidates (C3).

use chrono::Utc;
use feed_rs::model::Entry;
use krant_types::error::{KrantError, Result};
use krant_types::{Article, ArticleDraft};
use tracing::debug;

const MAX_SUMMARY_CHARS: usize = 2000;

/// Parse feed bytes into candidate article drafts, one per entry that has
/// at least a title and a link. Entries missing both are skipped and logged.
/// A malformed feed surfaces as `Err(Parse)` rather than an empty list, so
/// it stays distinguishable from a feed that legitimately had zero items.
pub fn parse_feed(bytes: &[u8], source: &str) -> Result<Vec<ArticleDraft>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|err| KrantError::Parse(format!("feed parse failed for {source}: {err}")))?;

    Ok(feed
        .entries
        .iter()
        .filter_map(|entry| match convert_entry(entry, source) {
            Some(draft) => Some(draft),
            None => {
                debug!(source, entry_id = %entry.id, "skipped feed entry with no usable title/link");
                None
            }
        })
        .collect())
}

fn convert_entry(entry: &Entry, source: &str) -> Option<ArticleDraft> {
    let title = sanitize_text(&entry.title.as_ref()?.content);
    if title.is_empty() {
        return None;
    }

    let url = entry
        .links
        .iter()
        .find(|link| link.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())?
        .href
        .clone();

    let summary = entry
        .summary
        .as_ref()
        .map(|s| truncate(&sanitize_text(&s.content), MAX_SUMMARY_CHARS))
        .filter(|s| !s.is_empty());

    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let author = entry.authors.first().map(|p| p.name.clone());

    let category = entry.categories.first().map(|c| c.term.clone());
    let keywords: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

    let image_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref())
        .map(|u| u.to_string());

    let body_for_hash = entry.summary.as_ref().map(|s| s.content.as_str()).unwrap_or("");
    let content_hash = Article::compute_content_hash(&title, body_for_hash, published);

    Some(ArticleDraft {
        url,
        content_hash,
        title,
        summary,
        published,
        source: source.to_string(),
        author,
        category,
        keywords,
        image_url,
    })
}

/// Collapse excess whitespace. Standard XML entities (`&amp;`, `&lt;`, ...)
/// are already decoded by feed-rs's underlying XML layer; this only cleans
/// up the whitespace feeds tend to leave in CDATA blocks.
fn sanitize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>NU.nl</title>
  <item>
    <title>Kabinet kondigt nieuwe maatregelen aan</title>
    <link>https://www.nu.nl/politiek/123.html</link>
    <description>Het kabinet heeft vandaag nieuwe maatregelen aangekondigd &amp; toegelicht.</description>
    <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    <category>politiek</category>
  </item>
  <item>
    <title></title>
    <link>https://www.nu.nl/empty.html</link>
  </item>
</channel>
</rss>"#;

    #[test]
    fn parses_valid_items_and_skips_untitled_ones() {
        let drafts = parse_feed(SAMPLE_RSS.as_bytes(), "nu.nl").unwrap();
        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.title, "Kabinet kondigt nieuwe maatregelen aan");
        assert_eq!(draft.url, "https://www.nu.nl/politiek/123.html");
        assert!(draft.summary.as_ref().unwrap().contains('&'));
        assert_eq!(draft.category.as_deref(), Some("politiek"));
    }

    #[test]
    fn malformed_bytes_surface_as_parse_error() {
        let err = parse_feed(b"not a feed", "nu.nl").unwrap_err();
        assert_eq!(err.code(), krant_types::error::ErrorCode::Parse);
    }

    #[test]
    fn summary_is_capped_at_max_chars() {
        let long = "a".repeat(MAX_SUMMARY_CHARS + 500);
        assert_eq!(truncate(&long, MAX_SUMMARY_CHARS).chars().count(), MAX_SUMMARY_CHARS);
    }
}
