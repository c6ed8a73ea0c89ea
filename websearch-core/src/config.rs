//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the fan-out wait budget, HTTP behaviour,
//! politeness delays, ranking strategy, caching, quota limits and page
//! fetching. Every section deserialises with `#[serde(default)]`, so a
//! TOML file only needs to name the values it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::content::ContentConfig;
use crate::error::SearchError;
use crate::quota::QuotaConfig;
use crate::ranking::RankConfig;

/// Largest result count a caller may request.
pub const MAX_REQUESTED_RESULTS: usize = 20;

/// Configuration for the search core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Overall time the orchestrator waits for all slots, in milliseconds.
    /// Slots still pending when it elapses contribute no results.
    pub wait_budget_ms: u64,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to request safe search filtering from engines that support it.
    pub safe_search: bool,
    /// Politeness delay range in milliseconds `(min, max)` between two calls
    /// to the same scraped engine. `min` is the base delay, `max - min`
    /// the random jitter.
    pub request_delay_ms: (u64, u64),
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// Ranking and deduplication settings.
    pub rank: RankConfig,
    /// Result cache settings.
    pub cache: CacheConfig,
    /// Metered API limits.
    pub quota: QuotaConfig,
    /// Page content fetching.
    pub content: ContentConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            wait_budget_ms: 8_000,
            timeout_seconds: 6,
            safe_search: true,
            request_delay_ms: (100, 500),
            user_agent: None,
            rank: RankConfig::default(),
            cache: CacheConfig::default(),
            quota: QuotaConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

impl SearchConfig {
    /// The orchestrator wait budget as a [`Duration`].
    pub fn wait_budget(&self) -> Duration {
        Duration::from_millis(self.wait_budget_ms)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `wait_budget_ms` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    /// - the ranking, cache, quota and content sections must each be valid
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.wait_budget_ms == 0 {
            return Err(SearchError::Config(
                "wait_budget_ms must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(SearchError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        self.rank.validate()?;
        self.cache.validate()?;
        self.quota.validate()?;
        self.content.validate()?;
        Ok(())
    }
}

/// Clamp a caller-supplied result count into `1..=MAX_REQUESTED_RESULTS`.
pub fn clamp_requested(count: usize) -> usize {
    count.clamp(1, MAX_REQUESTED_RESULTS)
}
