//! Error types for the websearch application layer.

use websearch_core::SearchError;

/// Errors raised while loading settings and wiring the search service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Settings file or environment value is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the search core.
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
