//! Exact deduplication by normalised URL.

use std::collections::HashMap;

use crate::types::ScoredCandidate;

use super::url_normalize::normalize_url;

/// Collapse candidates that share a normalised URL.
///
/// Each group keeps its highest-scored member; on a tie the first seen
/// wins. Groups are returned in the order their URL was first seen, so
/// the output preserves pooled order.
pub fn deduplicate(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ScoredCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = normalize_url(candidate.url());
        match index.get(&key) {
            Some(&slot) => {
                if candidate.quality_score > kept[slot].quality_score {
                    kept[slot] = candidate;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }
    kept
}

/// Stable sort by score, highest first.
pub fn sort_by_score(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
}
