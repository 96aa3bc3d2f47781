//! Shared error vocabulary for the ingestion and enrichment pipeline.
//!
//! Every fallible operation across the workspace carries one of these codes
//! so callers can classify failures by code rather than by type hierarchy
//! (see the error handling design: distinguishable by code, not type).

use thiserror::Error;

/// Result type alias using [`KrantError`].
pub type Result<T> = std::result::Result<T, KrantError>;

/// Stable classification for every error the pipeline can produce.
///
/// This is attached to every [`KrantError`] via [`KrantError::code`] so job
/// and article records can store a single classifiable code regardless of
/// which component raised the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    Timeout,
    Network,
    Http4xx,
    Http5xx,
    RateLimited,
    CircuitOpen,
    Parse,
    NoContent,
    Decode,
    NotAllowed,
    Cancelled,
    BudgetExhausted,
    ProviderUnsupported,
    Panic,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Network => "NETWORK",
            ErrorCode::Http4xx => "HTTP_4XX",
            ErrorCode::Http5xx => "HTTP_5XX",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::CircuitOpen => "CIRCUIT_OPEN",
            ErrorCode::Parse => "PARSE",
            ErrorCode::NoContent => "NO_CONTENT",
            ErrorCode::Decode => "DECODE",
            ErrorCode::NotAllowed => "NOT_ALLOWED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::BudgetExhausted => "BUDGET_EXHAUSTED",
            ErrorCode::ProviderUnsupported => "PROVIDER_UNSUPPORTED",
            ErrorCode::Panic => "PANIC",
        };
        f.write_str(s)
    }
}

/// Pipeline-wide error type.
#[derive(Error, Debug)]
pub enum KrantError {
    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("circuit open for {name}")]
    CircuitOpen { name: String },

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("no content extracted")]
    NoContent,

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("site not allowed: {0}")]
    NotAllowed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("daily budget exhausted")]
    BudgetExhausted,

    #[error("provider does not support this operation: {0}")]
    ProviderUnsupported(String),

    #[error("task panicked: {0}")]
    Panic(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KrantError {
    /// Classify this error into the stable [`ErrorCode`] vocabulary.
    pub fn code(&self) -> ErrorCode {
        match self {
            KrantError::Timeout(_) => ErrorCode::Timeout,
            KrantError::Network(_) => ErrorCode::Network,
            KrantError::HttpStatus { status } if (400..500).contains(status) => ErrorCode::Http4xx,
            KrantError::HttpStatus { .. } => ErrorCode::Http5xx,
            KrantError::RateLimited => ErrorCode::RateLimited,
            KrantError::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            KrantError::Parse(_) => ErrorCode::Parse,
            KrantError::NoContent => ErrorCode::NoContent,
            KrantError::Decode(_) => ErrorCode::Decode,
            KrantError::NotAllowed(_) => ErrorCode::NotAllowed,
            KrantError::Cancelled => ErrorCode::Cancelled,
            KrantError::BudgetExhausted => ErrorCode::BudgetExhausted,
            KrantError::ProviderUnsupported(_) => ErrorCode::ProviderUnsupported,
            KrantError::Panic(_) => ErrorCode::Panic,
            KrantError::Storage(_) | KrantError::Other(_) => ErrorCode::Network,
        }
    }

    /// Whether retrying this error is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::Timeout | ErrorCode::Network | ErrorCode::Http5xx | ErrorCode::RateLimited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_status_by_range() {
        assert_eq!(
            KrantError::HttpStatus { status: 404 }.code(),
            ErrorCode::Http4xx
        );
        assert_eq!(
            KrantError::HttpStatus { status: 503 }.code(),
            ErrorCode::Http5xx
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(KrantError::Network("x".into()).is_retryable());
        assert!(KrantError::Timeout(1000).is_retryable());
        assert!(!KrantError::NotAllowed("x".into()).is_retryable());
    }
}
