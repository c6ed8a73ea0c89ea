//! Startpage, a tracking-free proxy of Google's index.
//!
//! Serves as the fallback for the Google API slot. Two page layouts are
//! recognised: the current `.w-gl__result` markup and the older
//! `div.result` one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::provider::SearchProvider;
use crate::throttle::Throttle;
use crate::types::{ResultRecord, SearchEngine};

use super::html::{self, HtmlClient, ResultLayout};

const DEFAULT_BASE_URL: &str = "https://www.startpage.com";

const LAYOUTS: &[ResultLayout] = &[
    ResultLayout {
        container: ".w-gl__result:not(.w-gl__result--ad)",
        title: ".w-gl__result-title",
        snippet: ".w-gl__description",
    },
    ResultLayout {
        container: "div.result",
        title: "a.result-link",
        snippet: "p.description",
    },
];

/// Startpage HTML scraper.
pub struct StartpageEngine {
    http: HtmlClient,
}

impl StartpageEngine {
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
impl SearchProvider for StartpageEngine {
    fn name(&self) -> &str {
        SearchEngine::Startpage.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
        tracing::trace!(query, "Startpage search");

        let mut params = vec![("query", query), ("cat", "web")];
        if !self.http.safe_search {
            params.push(("qadf", "none"));
        }
        let request = self
            .http
            .client
            .get(format!("{}/sp/search", self.http.base_url))
            .query(&params);

        let body = self.http.fetch(self.name(), request).await?;
        parse_startpage_html(&body, limit)
    }
}

/// Parse a Startpage results page in either layout.
pub(crate) fn parse_startpage_html(
    body: &str,
    limit: usize,
) -> Result<Vec<ResultRecord>, SearchError> {
    html::parse_results(
        body,
        LAYOUTS,
        SearchEngine::Startpage.name(),
        limit,
        html::absolute_http,
    )
}
