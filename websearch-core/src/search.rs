//! The search façade: cache, fan-out, ranking and response assembly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheConfig, CacheKey, CacheStats, ResultCache};
use crate::clock::SystemClock;
use crate::config::{clamp_requested, SearchConfig};
use crate::error::SearchError;
use crate::orchestrator::{FanOut, Slot};
use crate::quota::{QuotaLedger, QuotaUsage};
use crate::ranking::{EnginePool, RankConfig, Ranker};
use crate::types::SearchResponse;

/// Cache of assembled responses keyed by query and requested count.
pub type ResponseCache = ResultCache<CacheKey, SearchResponse>;

/// Entry point for searches.
///
/// Built with [`WebSearch::builder`]. The cache and quota ledger are
/// shared handles, so several façades (or a façade and its API engines)
/// can use the same ones.
pub struct WebSearch {
    fan_out: FanOut,
    ranker: Ranker,
    cache: Arc<ResponseCache>,
    ledger: Arc<QuotaLedger>,
}

impl WebSearch {
    /// Start building a façade.
    pub fn builder() -> WebSearchBuilder {
        WebSearchBuilder::default()
    }

    /// Search for `query`, returning up to `num_results` ranked results.
    ///
    /// `num_results` is clamped to `1..=20`. A blank query returns an
    /// empty response without touching the cache or any provider. This
    /// method never fails: providers that error or time out simply
    /// contribute nothing.
    pub async fn search(&self, query: &str, num_results: usize) -> SearchResponse {
        let requested = clamp_requested(num_results);
        if query.trim().is_empty() {
            return SearchResponse::empty(query, requested);
        }
        tracing::trace!(query, requested, "search requested");

        let key = CacheKey::new(query, requested);
        if let Some(mut hit) = self.cache.get(&key) {
            hit.cached = true;
            tracing::info!(results = hit.total_results, "serving cached response");
            return hit;
        }

        let expired = self.cache.clear_expired();
        if expired > 0 {
            tracing::debug!(expired, "expired cache entries removed");
        }

        let outcomes = self.fan_out.run(query, requested).await;
        let mut sources = BTreeMap::new();
        let pools: Vec<EnginePool> = outcomes
            .into_iter()
            .map(|outcome| {
                sources.insert(outcome.label.clone(), outcome.results.len());
                EnginePool::new(outcome.label, outcome.results)
            })
            .collect();

        let results = self.ranker.rank(&pools, requested);
        let mut engine_distribution = BTreeMap::new();
        for candidate in &results {
            *engine_distribution
                .entry(candidate.engine().to_string())
                .or_insert(0) += 1;
        }

        let response = SearchResponse {
            query: query.to_string(),
            requested_count: requested,
            total_results: results.len(),
            sources,
            engine_distribution,
            results,
            cached: false,
        };
        self.cache.set(key, &response);

        tracing::info!(
            results = response.total_results,
            cache_size = self.cache.len(),
            "search complete"
        );
        response
    }

    /// Usage of every configured metered service.
    pub fn quota_status(&self) -> BTreeMap<String, QuotaUsage> {
        self.ledger.status()
    }

    /// Current cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Labels of the configured slots, in fan-out order.
    pub fn slot_labels(&self) -> Vec<&str> {
        self.fan_out.labels()
    }
}

/// Builder for [`WebSearch`].
pub struct WebSearchBuilder {
    slots: Vec<Slot>,
    wait_budget: Duration,
    rank: RankConfig,
    cache: Option<Arc<ResponseCache>>,
    ledger: Option<Arc<QuotaLedger>>,
}

impl Default for WebSearchBuilder {
    fn default() -> Self {
        let defaults = SearchConfig::default();
        Self {
            slots: Vec::new(),
            wait_budget: defaults.wait_budget(),
            rank: defaults.rank,
            cache: None,
            ledger: None,
        }
    }
}

impl WebSearchBuilder {
    /// Take the wait budget and ranking settings from `config`.
    pub fn config(mut self, config: &SearchConfig) -> Self {
        self.wait_budget = config.wait_budget();
        self.rank = config.rank.clone();
        self
    }

    /// Append a slot. Slots run in the order they are added.
    pub fn slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Overall time to wait for slots.
    pub fn wait_budget(mut self, budget: Duration) -> Self {
        self.wait_budget = budget;
        self
    }

    /// Ranking settings.
    pub fn rank_config(mut self, rank: RankConfig) -> Self {
        self.rank = rank;
        self
    }

    /// Response cache. Defaults to a fresh cache with default settings.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Quota ledger. Required.
    pub fn ledger(mut self, ledger: Arc<QuotaLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if no ledger was given, the wait
    /// budget is zero, or the ranking settings are invalid.
    pub fn build(self) -> Result<WebSearch, SearchError> {
        let ledger = self
            .ledger
            .ok_or_else(|| SearchError::Config("quota ledger not configured".into()))?;
        if self.wait_budget.is_zero() {
            return Err(SearchError::Config(
                "wait_budget must be greater than 0".into(),
            ));
        }
        self.rank.validate()?;
        if self.slots.is_empty() {
            tracing::warn!("search façade built with no slots");
        }

        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(ResultCache::new(&CacheConfig::default(), Arc::new(SystemClock)))
        });

        Ok(WebSearch {
            fan_out: FanOut::new(self.slots, self.wait_budget),
            ranker: Ranker::new(self.rank),
            cache,
            ledger,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::SearchProvider;
    use crate::quota::QuotaConfig;
    use crate::types::ResultRecord;

    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl SearchProvider for Counting {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Http("connection refused".into()));
            }
            Ok((1..=limit.min(6))
                .map(|i| {
                    ResultRecord::new(
                        format!("{query} result {i} from {}", self.name),
                        format!("https://{}.example/{i}", self.name.to_lowercase()),
                        format!("A snippet about {query} that is long enough to be useful, item {i}."),
                        self.name,
                        i,
                    )
                })
                .collect())
        }
    }

    struct Harness {
        search: WebSearch,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    fn harness(slots: Vec<Slot>) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let cache = Arc::new(ResultCache::new(&CacheConfig::default(), clock.clone()));
        let ledger = Arc::new(QuotaLedger::new(
            dir.path().join("quota.json"),
            QuotaConfig::default(),
            clock.clone(),
        ));
        let mut builder = WebSearch::builder()
            .wait_budget(Duration::from_secs(2))
            .cache(cache)
            .ledger(ledger);
        for slot in slots {
            builder = builder.slot(slot);
        }
        Harness {
            search: builder.build().expect("build"),
            clock,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn cached_within_ttl_recomputed_after() {
        let provider = Counting::new("Bing");
        let h = harness(vec![Slot::single("Bing", provider.clone())]);

        let first = h.search.search("rust async", 5).await;
        assert!(!first.cached);
        assert!(first.total_results > 0);

        h.clock.advance(chrono::Duration::seconds(100));
        let second = h.search.search("rust async", 5).await;
        assert!(second.cached);
        assert_eq!(second.results, first.results);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        h.clock.advance(chrono::Duration::seconds(300));
        let third = h.search.search("rust async", 5).await;
        assert!(!third.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_key_ignores_case_and_whitespace() {
        let provider = Counting::new("Bing");
        let h = harness(vec![Slot::single("Bing", provider.clone())]);
        h.search.search("Rust Async", 5).await;
        let again = h.search.search("  rust async ", 5).await;
        assert!(again.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_query_is_empty_and_skips_providers() {
        let provider = Counting::new("Bing");
        let h = harness(vec![Slot::single("Bing", provider.clone())]);
        let response = h.search.search("   ", 5).await;
        assert_eq!(response.total_results, 0);
        assert!(!response.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.search.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn requested_count_is_clamped() {
        let h = harness(vec![Slot::single("Bing", Counting::new("Bing"))]);
        assert_eq!(h.search.search("rust", 0).await.requested_count, 1);
        let big = h.search.search("rust", 50).await;
        assert_eq!(big.requested_count, 20);
        assert!(big.total_results <= 20);
    }

    #[tokio::test]
    async fn sources_count_raw_results_per_slot() {
        let h = harness(vec![
            Slot::with_fallback("Google/Startpage", Counting::failing("Google"), Counting::new("Startpage")),
            Slot::with_fallback("Bing/DuckDuckGo", Counting::new("Bing"), Counting::new("DuckDuckGo")),
            Slot::single("Brave", Counting::failing("Brave")),
        ]);
        let response = h.search.search("python", 10).await;

        assert_eq!(response.sources["Google/Startpage"], 6);
        assert_eq!(response.sources["Bing/DuckDuckGo"], 6);
        assert_eq!(response.sources["Brave"], 0);
        assert!(response.engine_distribution.contains_key("Startpage"));
        assert!(response.engine_distribution.contains_key("Bing"));
        assert!(!response.engine_distribution.contains_key("DuckDuckGo"));

        let counted: usize = response.engine_distribution.values().sum();
        assert_eq!(counted, response.total_results);
        assert_eq!(response.total_results, response.results.len());
    }

    #[tokio::test]
    async fn all_providers_failing_gives_empty_response() {
        let h = harness(vec![Slot::single("Brave", Counting::failing("Brave"))]);
        let response = h.search.search("python", 5).await;
        assert!(response.results.is_empty());
        assert_eq!(response.sources["Brave"], 0);
    }

    #[tokio::test]
    async fn quota_status_reports_configured_services() {
        let h = harness(Vec::new());
        let status = h.search.quota_status();
        assert_eq!(status["google"].limit, 100);
        assert_eq!(status["brave"].used, 0);
    }

    #[test]
    fn builder_requires_ledger() {
        let err = WebSearch::builder().build().err().expect("should fail");
        assert!(err.to_string().contains("ledger"));
    }
}
