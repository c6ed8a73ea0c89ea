//! Google Custom Search JSON API.
//!
//! Metered: the `google` quota service is checked before every request
//! and charged after every request the API accepted. HTTP 403 and 429
//! mean the daily allowance or rate limit is spent and surface as
//! [`SearchError::QuotaExhausted`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::provider::SearchProvider;
use crate::quota::QuotaLedger;
use crate::types::{ResultRecord, SearchEngine};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// The API returns at most this many items per request.
const MAX_PER_REQUEST: usize = 10;

const QUOTA_SERVICE: &str = "google";

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search API client.
pub struct GoogleApiEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cse_id: Option<String>,
    safe_search: bool,
    ledger: Arc<QuotaLedger>,
}

impl GoogleApiEngine {
    /// Create the client. Missing credentials are reported on `search`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &SearchConfig,
        api_key: Option<String>,
        cse_id: Option<String>,
        ledger: Arc<QuotaLedger>,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            cse_id: cse_id.filter(|k| !k.trim().is_empty()),
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
impl SearchProvider for GoogleApiEngine {
    fn name(&self) -> &str {
        SearchEngine::Google.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
        let (Some(api_key), Some(cse_id)) = (self.api_key.as_deref(), self.cse_id.as_deref()) else {
            return Err(SearchError::Config(
                "Google API key or CSE ID not configured".into(),
            ));
        };
        if !self.ledger.check(QUOTA_SERVICE).await {
            tracing::warn!("Google API quota exhausted for today");
            return Err(SearchError::QuotaExhausted(QUOTA_SERVICE.into()));
        }
        tracing::trace!(query, "Google API search");

        let num = limit.clamp(1, MAX_PER_REQUEST).to_string();
        let safe = if self.safe_search { "active" } else { "off" };
        let response = self
            .client
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", api_key),
                ("cx", cse_id),
                ("q", query),
                ("num", num.as_str()),
                ("safe", safe),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| http::request_error(self.name(), e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(%status, "Google API quota or rate limit hit");
            return Err(SearchError::QuotaExhausted(QUOTA_SERVICE.into()));
        }
        http::check_status(self.name(), status)?;
        self.ledger.charge(QUOTA_SERVICE).await;

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Google API response: {e}")))?;
        let results = into_records(body, limit);
        tracing::info!(count = results.len(), "Google API results");
        Ok(results)
    }
}

fn into_records(body: CseResponse, limit: usize) -> Vec<ResultRecord> {
    body.items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .take(limit)
        .enumerate()
        .map(|(i, item)| {
            ResultRecord::new(item.title, item.link, item.snippet, SearchEngine::Google.name(), i + 1)
        })
        .collect()
}
