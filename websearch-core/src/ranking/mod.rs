//! Ranking and deduplication of pooled provider results.
//!
//! [`Ranker::rank`] runs the whole pipeline:
//!
//! 1. take the top few records from each engine pool,
//! 2. score them ([`scoring::quality_score`]),
//! 3. deduplicate with the configured [`DedupStrategy`],
//! 4. order with the configured [`RankOrder`] and truncate.
//!
//! Ranking never fails. Empty input gives empty output.

pub mod compare;
pub mod dedup;
pub mod scoring;
pub mod smart;
pub mod url_normalize;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::{ResultRecord, ScoredCandidate};

use self::smart::SmartDeduplicator;

/// Floor applied to every quality score.
pub const MIN_SCORE: f64 = 0.1;

/// Most records taken from any single engine pool.
pub const MAX_POOL_PER_ENGINE: usize = 4;

/// How duplicate results are detected and collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupStrategy {
    /// Collapse by normalised URL, keeping the best-scored member.
    #[default]
    Exact,
    /// Content re-scoring, semantic near-duplicate removal and a
    /// per-domain cap.
    Smart,
    /// Run both, log how they differ, return the exact result.
    Compare,
}

/// Final ordering of exact-deduplicated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Highest score first (stable).
    #[default]
    ByScore,
    /// Pooled order: slot order, then engine rank.
    PoolOrder,
}

/// Ranking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Deduplication strategy.
    pub strategy: DedupStrategy,
    /// Ordering for exact output. Smart output is always score-ordered.
    pub order: RankOrder,
    /// Title or snippet similarity at which the smart path drops a result.
    pub similarity_threshold: f64,
    /// Results allowed per domain on the smart path.
    pub max_per_domain: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            strategy: DedupStrategy::Exact,
            order: RankOrder::ByScore,
            similarity_threshold: 0.7,
            max_per_domain: 2,
        }
    }
}

impl RankConfig {
    /// Validates the ranking section.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(SearchError::Config(
                "similarity_threshold must be in (0, 1]".into(),
            ));
        }
        if self.max_per_domain == 0 {
            return Err(SearchError::Config(
                "max_per_domain must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// The raw records one slot produced, tagged with the slot's label.
#[derive(Debug, Clone, PartialEq)]
pub struct EnginePool {
    /// Slot label the records came from.
    pub slot_role: Option<String>,
    /// Records in the engine's own order.
    pub records: Vec<ResultRecord>,
}

impl EnginePool {
    /// Create a pool of records from the slot labelled `slot_role`.
    pub fn new(slot_role: impl Into<String>, records: Vec<ResultRecord>) -> Self {
        Self {
            slot_role: Some(slot_role.into()),
            records,
        }
    }
}

/// Records taken from each pool for a given requested count:
/// `max(1, min(4, requested / 2))`.
pub fn pool_size(requested_count: usize) -> usize {
    (requested_count / 2).clamp(1, MAX_POOL_PER_ENGINE)
}

/// Pool and score candidates, skipping records with no URL or title.
pub fn pool_candidates(pools: &[EnginePool], requested_count: usize) -> Vec<ScoredCandidate> {
    let per_pool = pool_size(requested_count);
    let candidates: Vec<ScoredCandidate> = pools
        .iter()
        .flat_map(|pool| {
            pool.records
                .iter()
                .filter(|r| !r.url.is_empty() && !r.title.is_empty())
                .take(per_pool)
                .map(|record| ScoredCandidate {
                    quality_score: scoring::quality_score(record),
                    record: record.clone(),
                    slot_role: pool.slot_role.clone(),
                })
        })
        .collect();
    tracing::info!(per_pool, pooled = candidates.len(), "candidate pool built");
    candidates
}

/// Applies a [`RankConfig`] to pooled results.
#[derive(Debug, Clone)]
pub struct Ranker {
    config: RankConfig,
}

impl Ranker {
    /// Create a ranker with the given settings.
    pub fn new(config: RankConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Rank `pools` into at most `requested_count` unique results.
    pub fn rank(&self, pools: &[EnginePool], requested_count: usize) -> Vec<ScoredCandidate> {
        let candidates = pool_candidates(pools, requested_count);
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut ranked = match self.config.strategy {
            DedupStrategy::Exact => self.exact(candidates),
            DedupStrategy::Smart => self.smart(candidates),
            DedupStrategy::Compare => {
                let mut exact = self.exact(candidates.clone());
                exact.truncate(requested_count);
                let mut smart = self.smart(candidates);
                smart.truncate(requested_count);
                compare::log_comparison(&compare::compare(&exact, &smart));
                exact
            }
        };
        ranked.truncate(requested_count);
        tracing::info!(
            strategy = ?self.config.strategy,
            results = ranked.len(),
            "ranking complete"
        );
        ranked
    }

    fn exact(&self, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let before = candidates.len();
        let mut deduped = dedup::deduplicate(candidates);
        if self.config.order == RankOrder::ByScore {
            dedup::sort_by_score(&mut deduped);
        }
        tracing::info!(before, after = deduped.len(), "exact deduplication");
        deduped
    }

    fn smart(&self, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        SmartDeduplicator::new(self.config.similarity_threshold, self.config.max_per_domain)
            .process(candidates)
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankConfig::default())
    }
}
