//! HTTP fetching: decompression, charset normalization, retry with jitter (C2).

pub mod fetcher;

pub use fetcher::{Fetcher, RetryConfig};
