//! A fan-out slot: one provider, or a primary with a fallback.

use std::fmt;
use std::sync::Arc;

use crate::provider::SearchProvider;
use crate::types::ResultRecord;

/// Why a provider (or a whole slot) contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotFailure {
    /// The provider returned an error.
    Failed {
        /// Provider name.
        provider: String,
        /// Rendered [`crate::SearchError`].
        error: String,
    },
    /// The provider succeeded with no results.
    Empty {
        /// Provider name.
        provider: String,
    },
    /// The slot was still running when the wait budget ran out.
    TimedOut,
    /// The slot's task panicked or was cancelled.
    Aborted(String),
}

impl fmt::Display for SlotFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { provider, error } => write!(f, "{provider} failed: {error}"),
            Self::Empty { provider } => write!(f, "{provider} returned no results"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// What one slot contributed to a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotOutcome {
    /// The slot's display label.
    pub label: String,
    /// Provider that produced `results`, if any did.
    pub producer: Option<String>,
    /// Records from the producing provider; empty if none succeeded.
    pub results: Vec<ResultRecord>,
    /// Every failure observed, in the order it happened.
    pub failures: Vec<SlotFailure>,
}

impl SlotOutcome {
    /// An outcome with no results and a single failure.
    pub fn empty(label: impl Into<String>, failure: SlotFailure) -> Self {
        Self {
            label: label.into(),
            producer: None,
            results: Vec::new(),
            failures: vec![failure],
        }
    }
}

/// A labelled provider, optionally backed by a fallback.
#[derive(Clone)]
pub struct Slot {
    label: String,
    primary: Arc<dyn SearchProvider>,
    fallback: Option<Arc<dyn SearchProvider>>,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("label", &self.label)
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl Slot {
    /// A slot served by one provider.
    pub fn single(label: impl Into<String>, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            label: label.into(),
            primary: provider,
            fallback: None,
        }
    }

    /// A slot that tries `primary` and, if it errors or comes back empty,
    /// `fallback`.
    pub fn with_fallback(
        label: impl Into<String>,
        primary: Arc<dyn SearchProvider>,
        fallback: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            label: label.into(),
            primary,
            fallback: Some(fallback),
        }
    }

    /// The slot's display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the slot to completion. Never fails; errors become
    /// [`SlotFailure`]s on the outcome.
    pub async fn run(&self, query: &str, limit: usize) -> SlotOutcome {
        let mut failures = Vec::new();

        let providers = std::iter::once(&self.primary).chain(self.fallback.as_ref());
        for (attempt, provider) in providers.enumerate() {
            if attempt > 0 {
                tracing::info!(slot = %self.label, fallback = provider.name(), "engaging fallback");
            }
            match provider.search(query, limit).await {
                Ok(results) if !results.is_empty() => {
                    tracing::debug!(
                        slot = %self.label,
                        provider = provider.name(),
                        count = results.len(),
                        "slot produced results"
                    );
                    return SlotOutcome {
                        label: self.label.clone(),
                        producer: Some(provider.name().to_string()),
                        results,
                        failures,
                    };
                }
                Ok(_) => {
                    tracing::debug!(slot = %self.label, provider = provider.name(), "no results");
                    failures.push(SlotFailure::Empty {
                        provider: provider.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(slot = %self.label, provider = provider.name(), error = %e, "provider failed");
                    failures.push(SlotFailure::Failed {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        SlotOutcome {
            label: self.label.clone(),
            producer: None,
            results: Vec::new(),
            failures,
        }
    }
}
