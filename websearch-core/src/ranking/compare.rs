//! Side-by-side analysis of the exact and smart deduplication outputs.

use std::collections::BTreeSet;

use crate::types::ScoredCandidate;

use super::url_normalize::extract_domain;

/// Only the head of each list is analysed.
const ANALYSIS_WINDOW: usize = 10;

/// Diversity and richness metrics for one ranked list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListMetrics {
    /// Distinct domains among the first ten results.
    pub unique_domains: usize,
    /// Mean snippet length in characters among the first ten results.
    pub avg_snippet_len: f64,
    /// Length of the whole list.
    pub total_results: usize,
}

/// Metrics for both methods plus the smart method's gains.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupComparison {
    pub exact: ListMetrics,
    pub smart: ListMetrics,
    /// `smart.unique_domains - exact.unique_domains`.
    pub domain_gain: i64,
    /// `smart.avg_snippet_len - exact.avg_snippet_len`.
    pub snippet_len_gain: f64,
    /// Domain gain as a percentage of the exact method's domains; 0 when
    /// the exact list is empty.
    pub domain_gain_pct: f64,
}

/// Compute metrics for a ranked list.
pub fn metrics(results: &[ScoredCandidate]) -> ListMetrics {
    let head = &results[..results.len().min(ANALYSIS_WINDOW)];
    let domains: BTreeSet<String> = head.iter().map(|c| extract_domain(c.url())).collect();
    let avg_snippet_len = if head.is_empty() {
        0.0
    } else {
        head.iter().map(|c| c.snippet().chars().count()).sum::<usize>() as f64 / head.len() as f64
    };
    ListMetrics {
        unique_domains: domains.len(),
        avg_snippet_len,
        total_results: results.len(),
    }
}

/// Compare the two methods' final (truncated) lists.
pub fn compare(exact: &[ScoredCandidate], smart: &[ScoredCandidate]) -> DedupComparison {
    let exact = metrics(exact);
    let smart = metrics(smart);
    let domain_gain = smart.unique_domains as i64 - exact.unique_domains as i64;
    let domain_gain_pct = if exact.unique_domains > 0 {
        domain_gain as f64 / exact.unique_domains as f64 * 100.0
    } else {
        0.0
    };
    DedupComparison {
        snippet_len_gain: smart.avg_snippet_len - exact.avg_snippet_len,
        domain_gain,
        domain_gain_pct,
        exact,
        smart,
    }
}

/// Emit a comparison at info level.
pub fn log_comparison(comparison: &DedupComparison) {
    tracing::info!(
        exact_domains = comparison.exact.unique_domains,
        smart_domains = comparison.smart.unique_domains,
        exact_avg_snippet = comparison.exact.avg_snippet_len,
        smart_avg_snippet = comparison.smart.avg_snippet_len,
        domain_gain = comparison.domain_gain,
        domain_gain_pct = comparison.domain_gain_pct,
        "deduplication comparison"
    );
}
