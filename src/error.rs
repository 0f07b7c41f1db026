//! Error taxonomy for the discovery pipeline.
//!
//! Two error families cross module boundaries:
//!
//! - [`AdapterError`]: a single upstream source failed. Always recovered by
//!   the aggregator and turned into a `perSourceStatus` entry.
//! - [`QueryError`]: the caller sent a malformed query. Rejected before any
//!   adapter is invoked and surfaced to the caller as a validation error.
//!
//! Everything else (config loading, database setup, CLI plumbing) uses
//! `anyhow::Result`.

use serde::Serialize;

/// Typed failure returned by a [`SourceAdapter`](crate::traits::SourceAdapter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl AdapterError {
    /// Stable machine-readable kind, used in `perSourceStatus` and health counters.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Timeout { .. } => "timeout",
            AdapterError::RateLimited => "rate_limited",
            AdapterError::MalformedResponse(_) => "malformed_response",
            AdapterError::Unavailable(_) => "unavailable",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Timeout { .. })
    }

    /// Serializable summary for result payloads.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::MalformedResponse(err.to_string())
    }
}

/// Kind + message pair attached to a failed source status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Validation failure for an incoming search query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid duration range: min {min} is greater than max {max}")]
    DurationRange { min: u64, max: u64 },

    #[error("invalid upload date range: from {from} is after to {to}")]
    DateRange { from: String, to: String },

    #[error("limit must be between 1 and {max}, got {got}")]
    Limit { got: usize, max: usize },

    #[error("query text is too long ({len} > {max} characters)")]
    TextTooLong { len: usize, max: usize },
}
