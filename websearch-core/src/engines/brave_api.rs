//! Brave Search web API.
//!
//! Authenticated with an `X-Subscription-Token` header and metered
//! against the monthly `brave` quota service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::provider::SearchProvider;
use crate::quota::QuotaLedger;
use crate::types::{ResultRecord, SearchEngine};

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com";

const MAX_PER_REQUEST: usize = 20;

const QUOTA_SERVICE: &str = "brave";

#[derive(Debug, Default, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWeb,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveItem>,
}

#[derive(Debug, Deserialize)]
struct BraveItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

/// Brave Search API client.
pub struct BraveApiEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    safe_search: bool,
    ledger: Arc<QuotaLedger>,
}

impl BraveApiEngine {
    /// Create the client. A missing key is reported on `search`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &SearchConfig,
        api_key: Option<String>,
        ledger: Arc<QuotaLedger>,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            safe_search: config.safe_search,
            ledger,
        })
    }

    /// Point the engine at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SearchProvider for BraveApiEngine {
    fn name(&self) -> &str {
        SearchEngine::Brave.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::Config("Brave API key not configured".into()));
        };
        if !self.ledger.check(QUOTA_SERVICE).await {
            tracing::warn!("Brave API quota exhausted for this month");
            return Err(SearchError::QuotaExhausted(QUOTA_SERVICE.into()));
        }
        tracing::trace!(query, "Brave API search");

        let count = limit.clamp(1, MAX_PER_REQUEST).to_string();
        let safesearch = if self.safe_search { "strict" } else { "off" };
        let response = self
            .client
            .get(format!("{}/res/v1/web/search", self.base_url))
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("country", "us"),
                ("search_lang", "en"),
                ("safesearch", safesearch),
            ])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await
            .map_err(|e| http::request_error(self.name(), e))?;

        http::check_status(self.name(), response.status())?;
        self.ledger.charge(QUOTA_SERVICE).await;

        let body: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Brave API response: {e}")))?;
        let results = into_records(body, limit);
        tracing::info!(count = results.len(), "Brave API results");
        Ok(results)
    }
}

fn into_records(body: BraveResponse, limit: usize) -> Vec<ResultRecord> {
    body.web
        .results
        .into_iter()
        .filter(|item| !item.url.is_empty())
        .take(limit)
        .enumerate()
        .map(|(i, item)| {
            ResultRecord::new(item.title, item.url, item.description, SearchEngine::Brave.name(), i + 1)
        })
        .collect()
}
