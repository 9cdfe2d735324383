//! Error types for quote fetching and alert delivery.

use thiserror::Error;

/// Failure of a single upstream quote source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source answered `429 Too Many Requests`.
    #[error("{source_name}: rate limited")]
    RateLimited { source_name: String },

    /// Transport failure, timeout, or a non-success status.
    #[error("{source_name}: unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// The response body did not have the expected shape.
    #[error("{source_name}: schema mismatch: {reason}")]
    SchemaMismatch { source_name: String, reason: String },
}

impl SourceError {
    /// Whether the retry policy should try the call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::Unavailable { .. }
        )
    }

    pub fn source_name(&self) -> &str {
        match self {
            SourceError::RateLimited { source_name }
            | SourceError::Unavailable { source_name, .. }
            | SourceError::SchemaMismatch { source_name, .. } => source_name,
        }
    }
}

/// Failure of a whole fetch cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("no quote sources configured")]
    NoSources,

    /// Every configured source failed in this cycle.
    #[error("all {failed} quote sources failed")]
    AllSourcesFailed { failed: usize },
}

/// Failure to deliver one message to one recipient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The messaging platform refused the message (blocked bot, unknown chat, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The request never got a usable answer.
    #[error("transport: {0}")]
    Transport(String),
}
