//! # websearch-core
//!
//! Multi-provider web search: fan a query out to several unreliable
//! search providers, merge what comes back into one ranked and
//! deduplicated list, and keep repeated use cheap with a result cache and
//! on-disk quota accounting for metered APIs.
//!
//! ## Design
//!
//! - Slots run concurrently under one wait budget; a slot may pair a
//!   primary provider with a fallback
//! - HTML scrapers (DuckDuckGo, Bing, Startpage) and JSON APIs (Google
//!   Custom Search, Brave Search) behind one [`SearchProvider`] trait
//! - Heuristic scoring with exact (URL) or smart (semantic + domain
//!   diversity) deduplication
//! - In-memory LRU cache with TTL and gzip-compressed payloads
//! - Quota ledger shared between processes via `flock` and atomic writes
//! - Page fetching that reduces HTML to readable text, with per-URL
//!   classified failures
//!
//! ## Security
//!
//! - Search queries are logged only at trace level
//! - The quota ledger is written with owner-only permissions
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> websearch_core::Result<()> {
//! use std::sync::Arc;
//! use websearch_core::engines::{BingEngine, DuckDuckGoEngine};
//! use websearch_core::{QuotaLedger, SearchConfig, Slot, SystemClock, Throttle, WebSearch};
//!
//! let config = SearchConfig::default();
//! let throttle = Arc::new(Throttle::from_config(&config));
//! let ledger = Arc::new(QuotaLedger::new(
//!     "/tmp/quota.json",
//!     config.quota.clone(),
//!     Arc::new(SystemClock),
//! ));
//! let search = WebSearch::builder()
//!     .config(&config)
//!     .slot(Slot::with_fallback(
//!         "Bing/DuckDuckGo",
//!         Arc::new(BingEngine::new(&config, throttle.clone())?),
//!         Arc::new(DuckDuckGoEngine::new(&config, throttle)?),
//!     ))
//!     .ledger(ledger)
//!     .build()?;
//!
//! let response = search.search("rust async runtime", 5).await;
//! for result in &response.results {
//!     println!("{}: {}", result.title(), result.url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod content;
pub mod engines;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod quota;
pub mod ranking;
pub mod search;
pub mod throttle;
pub mod types;

pub use cache::{CacheConfig, CacheKey, CacheStats, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SearchConfig;
pub use content::{
    ContentConfig, ContentFetcher, FetchErrorKind, FetchFailure, FetchOutcome, PageCache,
    PageContent, PageFetch,
};
pub use error::{Result, SearchError};
pub use orchestrator::{FanOut, Slot, SlotFailure, SlotOutcome};
pub use provider::SearchProvider;
pub use quota::{QuotaConfig, QuotaLedger, QuotaPeriod, QuotaState, QuotaUsage, ServiceQuota};
pub use ranking::{DedupStrategy, EnginePool, RankConfig, RankOrder, Ranker};
pub use search::{ResponseCache, WebSearch, WebSearchBuilder};
pub use throttle::Throttle;
pub use types::{ResultRecord, ScoredCandidate, SearchEngine, SearchResponse};
