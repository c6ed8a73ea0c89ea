//! Heuristic quality scoring.
//!
//! The base score decays linearly with the engine's own rank and is nudged
//! by how much text the result carries:
//!
//! ```text
//! score = max(MIN_SCORE, 10 - (engine_rank - 1) * 2 + bonus - penalty)
//! bonus   = 0.5 if title > 20 chars, + 0.5 if snippet > 50 chars
//! penalty = 1.0 if title < 10 chars or snippet < 20 chars
//! ```
//!
//! The smart path layers [`content_quality`] on top.

use crate::types::ResultRecord;

use super::MIN_SCORE;

/// Upper bound applied by the content-quality adjustment.
pub const MAX_SCORE: f64 = 10.0;

/// Characters that suggest a structured, information-dense snippet.
const STRUCTURE_MARKERS: &[char] = &['•', ':', '|', '—', '–'];

/// Base quality score for a record.
pub fn quality_score(record: &ResultRecord) -> f64 {
    let position = record.engine_rank.saturating_sub(1) as f64;
    let title_len = record.title.chars().count();
    let snippet_len = record.snippet.chars().count();

    let mut bonus = 0.0;
    if title_len > 20 {
        bonus += 0.5;
    }
    if snippet_len > 50 {
        bonus += 0.5;
    }
    let penalty = if title_len < 10 || snippet_len < 20 {
        1.0
    } else {
        0.0
    };

    (10.0 - position * 2.0 + bonus - penalty).max(MIN_SCORE)
}

/// Re-score a candidate using snippet and title content signals.
///
/// Result is clamped to `[MIN_SCORE, MAX_SCORE]`.
pub fn content_quality(score: f64, title: &str, snippet: &str) -> f64 {
    let mut adjusted = score;
    let snippet_trimmed = snippet.trim();
    let snippet_len = snippet.chars().count();

    if snippet_len >= 100 {
        adjusted += 0.2;
    } else if snippet_len >= 50 {
        adjusted += 0.1;
    }
    if snippet.contains(STRUCTURE_MARKERS) {
        adjusted += 0.1;
    }
    if snippet_len < 20 || snippet_trimmed.is_empty() {
        adjusted -= 0.3;
    }
    if title.chars().count() > 10 && title != title.to_uppercase() {
        adjusted += 0.05;
    }

    adjusted.clamp(MIN_SCORE, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, snippet: &str, rank: usize) -> ResultRecord {
        ResultRecord::new(title, "https://example.com", snippet, "Bing", rank)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn top_rank_with_rich_text_gets_both_bonuses() {
        let r = record(
            "A fairly long descriptive title",
            "A snippet that is comfortably longer than fifty characters in total.",
            1,
        );
        assert!(approx(quality_score(&r), 11.0));
    }

    #[test]
    fn rank_decays_by_two_per_position() {
        let title = "Medium title here";
        let snippet = "Twenty plus characters of text";
        assert!(approx(quality_score(&record(title, snippet, 1)), 10.0));
        assert!(approx(quality_score(&record(title, snippet, 2)), 8.0));
        assert!(approx(quality_score(&record(title, snippet, 4)), 4.0));
    }

    #[test]
    fn short_fields_are_penalised_once() {
        assert!(approx(quality_score(&record("Short", "tiny", 1)), 9.0));
    }

    #[test]
    fn score_never_below_floor() {
        let r = record("Short", "tiny", 9);
        assert!(approx(quality_score(&r), MIN_SCORE));
    }

    #[test]
    fn content_quality_rewards_long_structured_snippets() {
        let snippet = "Features: fast • safe • concurrent | ".repeat(4);
        let adjusted = content_quality(5.0, "Rust language", &snippet);
        assert!(approx(adjusted, 5.0 + 0.2 + 0.1 + 0.05));
    }

    #[test]
    fn content_quality_penalises_thin_snippet() {
        assert!(approx(content_quality(5.0, "SHOUTING TITLE", "thin"), 4.7));
        assert!(approx(content_quality(5.0, "short", "   "), 4.7));
    }

    #[test]
    fn content_quality_clamped() {
        let long = "x".repeat(150);
        assert!(approx(content_quality(9.9, "Normal title here", &long), MAX_SCORE));
        assert!(approx(content_quality(0.1, "x", ""), MIN_SCORE));
    }
}
