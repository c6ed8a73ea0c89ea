//! The uniform interface every search backend implements.
//!
//! Slots in the fan-out hold providers as `Arc<dyn SearchProvider>`, so
//! the trait is object safe and uses `async-trait` for its async method.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::ResultRecord;

/// A search backend: an HTML-scraped engine, a JSON API, or a test double.
///
/// Implementations return [`SearchError`] for every ordinary failure
/// (network, parse, exhausted quota, missing credentials). The
/// orchestrator turns those into an empty contribution and engages the
/// slot's fallback.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name, recorded as [`ResultRecord::engine`].
    fn name(&self) -> &str;

    /// Run `query` and return at most `limit` records in the provider's
    /// own order, with 1-based `engine_rank`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the response cannot
    /// be parsed, or the provider refuses to run (quota, credentials).
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError>;
}
