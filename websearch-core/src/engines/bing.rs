//! Bing HTML results, a second independent index behind Google.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::provider::SearchProvider;
use crate::throttle::Throttle;
use crate::types::{ResultRecord, SearchEngine};

use super::html::{self, HtmlClient, ResultLayout};

const DEFAULT_BASE_URL: &str = "https://www.bing.com";

// Organic results are `li.b_algo`; the snippet moved between
// `.b_caption p` and `.b_lineclamp*` across redesigns.
const LAYOUTS: &[ResultLayout] = &[ResultLayout {
    container: "li.b_algo",
    title: "h2",
    snippet: ".b_caption p, .b_lineclamp2, .b_lineclamp3, p",
}];

/// Bing HTML scraper.
pub struct BingEngine {
    http: HtmlClient,
}

impl BingEngine {
    /// Create the engine against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, throttle: Arc<Throttle>) -> Result<Self, SearchError> {
        Ok(Self {
            http: HtmlClient::new(config, throttle, DEFAULT_BASE_URL)?,
        })
    }

    /// Point the engine at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.http.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl SearchProvider for BingEngine {
    fn name(&self) -> &str {
        SearchEngine::Bing.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
        tracing::trace!(query, "Bing search");

        let safe_search = if self.http.safe_search { "Strict" } else { "Off" };
        let request = self
            .http
            .client
            .get(format!("{}/search", self.http.base_url))
            .query(&[("q", query), ("setlang", "en"), ("safeSearch", safe_search)]);

        let body = self.http.fetch(self.name(), request).await?;
        parse_bing_html(&body, limit)
    }
}

/// Parse a Bing results page.
pub(crate) fn parse_bing_html(body: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
    html::parse_results(
        body,
        LAYOUTS,
        SearchEngine::Bing.name(),
        limit,
        html::absolute_http,
    )
}
