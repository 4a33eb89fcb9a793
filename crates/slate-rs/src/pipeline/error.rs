//! Error taxonomy for the upstream text source and the artifact sink.
//!
//! Upstream failures are classified from their raw provider/transport
//! message so each class can be surfaced as its own typed event. Classification
//! never retries anything by itself; [`UpstreamError::is_transient`] only
//! tells a caller whether a retry could help.

use thiserror::Error;

/// A failure reported by the upstream text source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Stream interrupted: {0}")]
    Interrupted(String),
    #[error("{0}")]
    Other(String),
}

const RATE_LIMIT_PATTERNS: &[&str] = &["http 429", "rate limit", "rate_limit", "too many requests"];
const TIMEOUT_PATTERNS: &[&str] = &["timed out", "timeout"];
const CONNECTION_PATTERNS: &[&str] = &[
    "connection reset",
    "connection refused",
    "network",
    "request failed",
    "dns error",
];
const INTERRUPTED_PATTERNS: &[&str] = &["broken pipe", "stream ended", "interrupted", "incomplete"];
const TRANSIENT_STATUSES: &[&str] = &["http 500", "http 502", "http 503", "http 504"];

impl UpstreamError {
    /// Classify a raw error message by substring, case-insensitively.
    ///
    /// ```
    /// use slate_rs::pipeline::UpstreamError;
    ///
    /// assert!(matches!(UpstreamError::classify("HTTP 429: slow down"), UpstreamError::RateLimited(_)));
    /// assert!(matches!(UpstreamError::classify("operation timed out"), UpstreamError::Timeout(_)));
    /// assert!(matches!(UpstreamError::classify("bad api key"), UpstreamError::Other(_)));
    /// ```
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));
        let message = message.to_string();

        if matches(RATE_LIMIT_PATTERNS) {
            UpstreamError::RateLimited(message)
        } else if matches(TIMEOUT_PATTERNS) {
            UpstreamError::Timeout(message)
        } else if matches(CONNECTION_PATTERNS) {
            UpstreamError::Connection(message)
        } else if matches(INTERRUPTED_PATTERNS) {
            UpstreamError::Interrupted(message)
        } else {
            UpstreamError::Other(message)
        }
    }

    /// The raw message the error was built from.
    pub fn message(&self) -> &str {
        match self {
            UpstreamError::Timeout(m)
            | UpstreamError::RateLimited(m)
            | UpstreamError::Connection(m)
            | UpstreamError::Interrupted(m)
            | UpstreamError::Other(m) => m,
        }
    }

    /// Whether retrying the request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Timeout(_)
            | UpstreamError::RateLimited(_)
            | UpstreamError::Connection(_)
            | UpstreamError::Interrupted(_) => true,
            UpstreamError::Other(m) => {
                let lower = m.to_lowercase();
                TRANSIENT_STATUSES.iter().any(|s| lower.contains(s))
            }
        }
    }
}

/// Failure to materialize a completed artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to materialize {id}: {reason}")]
    Rejected { id: String, reason: String },
}

impl SinkError {
    pub fn rejected(id: impl Into<String>, reason: impl Into<String>) -> Self {
        SinkError::Rejected {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
