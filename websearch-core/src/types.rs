//! Core types: provider records, scored candidates and the search response.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single result as produced by one provider adapter.
///
/// Records are immutable once an adapter has returned them; ranking
/// wraps them in [`ScoredCandidate`] rather than editing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The title of the result page.
    pub title: String,
    /// The URL of the result.
    pub url: String,
    /// A text snippet summarising the page content.
    pub snippet: String,
    /// Name of the provider that returned this record.
    pub engine: String,
    /// 1-based position inside that provider's own result list.
    pub engine_rank: usize,
}

impl ResultRecord {
    /// Build a record, trimming surrounding whitespace from the text fields.
    pub fn new(
        title: impl AsRef<str>,
        url: impl AsRef<str>,
        snippet: impl AsRef<str>,
        engine: impl Into<String>,
        engine_rank: usize,
    ) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            url: url.as_ref().trim().to_string(),
            snippet: snippet.as_ref().trim().to_string(),
            engine: engine.into(),
            engine_rank,
        }
    }
}

/// A result after quality scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The underlying provider record.
    #[serde(flatten)]
    pub record: ResultRecord,
    /// Heuristic quality score, never below [`crate::ranking::MIN_SCORE`].
    pub quality_score: f64,
    /// Label of the fan-out slot that produced this candidate, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_role: Option<String>,
}

impl ScoredCandidate {
    /// The candidate's URL.
    pub fn url(&self) -> &str {
        &self.record.url
    }

    /// The candidate's title.
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// The candidate's snippet.
    pub fn snippet(&self) -> &str {
        &self.record.snippet
    }

    /// The originating engine name.
    pub fn engine(&self) -> &str {
        &self.record.engine
    }
}

/// The assembled answer to one `search` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as given by the caller.
    pub query: String,
    /// Requested result count after clamping to `1..=20`.
    pub requested_count: usize,
    /// Number of entries in `results`.
    pub total_results: usize,
    /// Raw result count per slot label, before deduplication.
    pub sources: BTreeMap<String, usize>,
    /// Result count per engine, after deduplication and truncation.
    pub engine_distribution: BTreeMap<String, usize>,
    /// Ranked results; no two share a normalised URL.
    pub results: Vec<ScoredCandidate>,
    /// Whether this response was served from the result cache.
    pub cached: bool,
}

impl SearchResponse {
    /// A response with no results, used for blank queries.
    pub fn empty(query: &str, requested_count: usize) -> Self {
        Self {
            query: query.to_string(),
            requested_count,
            total_results: 0,
            sources: BTreeMap::new(),
            engine_distribution: BTreeMap::new(),
            results: Vec::new(),
            cached: false,
        }
    }
}

/// Built-in providers that the default slot layout knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEngine {
    /// DuckDuckGo HTML endpoint.
    DuckDuckGo,
    /// Bing HTML results.
    Bing,
    /// Startpage HTML results (proxied Google index).
    Startpage,
    /// Google Custom Search JSON API (metered, daily quota).
    Google,
    /// Brave Search API (metered, monthly quota).
    Brave,
}

impl SearchEngine {
    /// Returns the human-readable name of this engine.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing",
            Self::Startpage => "Startpage",
            Self::Google => "Google",
            Self::Brave => "Brave",
        }
    }

    /// The quota ledger service this engine draws from, if it is metered.
    pub fn quota_service(&self) -> Option<&'static str> {
        match self {
            Self::Google => Some("google"),
            Self::Brave => Some("brave"),
            Self::DuckDuckGo | Self::Bing | Self::Startpage => None,
        }
    }

    /// Returns all available engine variants.
    pub fn all() -> &'static [SearchEngine] {
        &[
            Self::DuckDuckGo,
            Self::Bing,
            Self::Startpage,
            Self::Google,
            Self::Brave,
        ]
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
