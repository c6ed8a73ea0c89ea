//! Error types for the websearch-core crate.
//!
//! Messages are stable strings suitable for logs. API keys never appear
//! in error messages; adapters format only the service name and status.

/// Errors that can occur inside the search core.
///
/// Provider-level variants (`Http`, `Parse`, `Timeout`, `QuotaExhausted`)
/// are absorbed by the orchestrator and never reach the caller of
/// [`crate::WebSearch::search`]. They are kept as values so that slot
/// outcomes stay inspectable.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A provider or slot did not answer inside its time budget.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// The metered API has used up its quota for the current period.
    #[error("quota exhausted for {0}")]
    QuotaExhausted(String),

    /// Invalid configuration or missing credentials.
    #[error("config error: {0}")]
    Config(String),

    /// Reading or writing persisted state failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A cache payload could not be encoded or decoded.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Convenience type alias for websearch-core results.
pub type Result<T> = std::result::Result<T, SearchError>;
