//! Smart deduplication: content re-scoring, semantic near-duplicate
//! removal and a per-domain cap.

use std::collections::{HashMap, HashSet};

use crate::types::ScoredCandidate;

use super::dedup::sort_by_score;
use super::scoring::content_quality;
use super::url_normalize::{extract_domain, normalize_url};

/// Word 3-gram Jaccard similarity of two texts, in `[0.0, 1.0]`.
///
/// Texts are lower-cased with punctuation replaced by spaces. Texts of
/// fewer than three words compare by their word sets.
pub fn jaccard_3gram(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.chars().count() < 3 || b.chars().count() < 3 {
        return if a == b { 1.0 } else { 0.0 };
    }

    let grams_a = shingles(&a);
    let grams_b = shingles(&b);
    if grams_a.is_empty() && grams_b.is_empty() {
        return 1.0;
    }
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        return 0.0;
    }
    grams_a.intersection(&grams_b).count() as f64 / union as f64
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

fn shingles(text: &str) -> HashSet<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 3 {
        return words.into_iter().map(str::to_string).collect();
    }
    words.windows(3).map(|w| w.join(" ")).collect()
}

/// Drop candidates whose normalised URL was already accepted, or whose
/// title or snippet is at least `threshold` similar to an accepted one.
///
/// Input order decides precedence, so callers sort by score first.
pub fn semantic_dedup(candidates: Vec<ScoredCandidate>, threshold: f64) -> Vec<ScoredCandidate> {
    let before = candidates.len();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut accepted: Vec<ScoredCandidate> = Vec::with_capacity(before);

    for candidate in candidates {
        let key = normalize_url(candidate.url());
        if seen_urls.contains(&key) {
            continue;
        }
        let duplicate = accepted.iter().find_map(|existing| {
            let title_sim = jaccard_3gram(candidate.title(), existing.title());
            let snippet_sim = jaccard_3gram(candidate.snippet(), existing.snippet());
            (title_sim >= threshold || snippet_sim >= threshold).then_some((title_sim, snippet_sim))
        });
        if let Some((title_sim, snippet_sim)) = duplicate {
            tracing::debug!(title_sim, snippet_sim, "semantic duplicate dropped");
            continue;
        }
        seen_urls.insert(key);
        accepted.push(candidate);
    }

    tracing::info!(before, after = accepted.len(), "semantic deduplication");
    accepted
}

/// Keep at most `max_per_domain` candidates per domain, earliest first.
pub fn enforce_domain_diversity(
    candidates: Vec<ScoredCandidate>,
    max_per_domain: usize,
) -> Vec<ScoredCandidate> {
    let before = candidates.len();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let kept: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|candidate| {
            let count = counts.entry(extract_domain(candidate.url())).or_insert(0);
            if *count < max_per_domain {
                *count += 1;
                true
            } else {
                false
            }
        })
        .collect();

    tracing::info!(
        unique_domains = counts.len(),
        filtered = before - kept.len(),
        "domain diversity"
    );
    kept
}

/// The smart pipeline: re-score, sort, semantic dedup, domain cap.
#[derive(Debug, Clone, Copy)]
pub struct SmartDeduplicator {
    similarity_threshold: f64,
    max_per_domain: usize,
}

impl SmartDeduplicator {
    /// Create a deduplicator with the given threshold and domain cap.
    pub fn new(similarity_threshold: f64, max_per_domain: usize) -> Self {
        Self {
            similarity_threshold,
            max_per_domain,
        }
    }

    /// Run the pipeline. Output is in descending score order.
    pub fn process(&self, mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        if candidates.is_empty() {
            return candidates;
        }
        let before = candidates.len();

        for candidate in &mut candidates {
            candidate.quality_score =
                content_quality(candidate.quality_score, candidate.title(), candidate.snippet());
        }
        sort_by_score(&mut candidates);

        let deduped = semantic_dedup(candidates, self.similarity_threshold);
        let kept = enforce_domain_diversity(deduped, self.max_per_domain);
        tracing::info!(before, after = kept.len(), "smart deduplication complete");
        kept
    }
}
