//! HTML content extraction: site-specific → generic → paragraph fallback (C4).

pub mod extractor;
pub mod sanitize;
pub mod site_selectors;

pub use extractor::{extract, ExtractedContent, ExtractionStrategy};
