//! DuckDuckGo via its JavaScript-free HTML endpoint.
//!
//! Result links are wrapped in `//duckduckgo.com/l/?uddg=<target>`
//! redirects, which are unwrapped before the record is built.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::provider::SearchProvider;
use crate::throttle::Throttle;
use crate::types::{ResultRecord, SearchEngine};

use super::html::{self, HtmlClient, ResultLayout};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const LAYOUTS: &[ResultLayout] = &[ResultLayout {
    container: ".result.results_links:not(.result--ad), .web-result:not(.result--ad)",
    title: ".result__a",
    snippet: ".result__snippet",
}];

/// DuckDuckGo HTML scraper.
pub struct DuckDuckGoEngine {
    http: HtmlClient,
}

impl DuckDuckGoEngine {
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

    /// Resolve a result `href`, unwrapping DuckDuckGo's redirect.
    fn extract_url(href: &str) -> Option<String> {
        let full_href = if href.starts_with("//") {
            format!("https:{href}")
        } else {
            href.to_string()
        };

        let parsed = Url::parse(&full_href).ok()?;
        if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "uddg")
                .and_then(|(_, value)| html::absolute_http(&value))
        } else {
            html::absolute_http(&full_href)
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoEngine {
    fn name(&self) -> &str {
        SearchEngine::DuckDuckGo.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResultRecord>, SearchError> {
        tracing::trace!(query, "DuckDuckGo search");

        let mut form = vec![("q", query)];
        if self.http.safe_search {
            form.push(("kp", "1"));
        }
        let request = self
            .http
            .client
            .post(format!("{}/html/", self.http.base_url))
            .form(&form);

        let body = self.http.fetch(self.name(), request).await?;
        parse_duckduckgo_html(&body, limit)
    }
}

/// Parse a DuckDuckGo HTML results page.
pub(crate) fn parse_duckduckgo_html(
    body: &str,
    limit: usize,
) -> Result<Vec<ResultRecord>, SearchError> {
    html::parse_results(
        body,
        LAYOUTS,
        SearchEngine::DuckDuckGo.name(),
        limit,
        DuckDuckGoEngine::extract_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_DDG_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.python.org%2F&amp;rut=abc123">
        Welcome to Python.org
    </a>
    <a class="result__snippet">The official home of the Python Programming Language.</a>
</div>
<div class="result results_links results_links_deep web-result result--ad">
    <a class="result__a" href="https://ads.example.com/">Sponsored</a>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="https://docs.python.org/3/tutorial/">
        The Python Tutorial
    </a>
    <div class="result__snippet">Python is an easy to learn, powerful programming language.</div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FPython_(programming_language)&amp;rut=def456">
        Python (programming language) - Wikipedia
    </a>
</div>
</body>
</html>"#;

    #[test]
    fn extract_url_from_ddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(
            DuckDuckGoEngine::extract_url(href),
            Some("https://example.com/page".to_string())
        );
    }

    #[test]
    fn extract_url_direct_link() {
        assert_eq!(
            DuckDuckGoEngine::extract_url("https://example.com/direct"),
            Some("https://example.com/direct".to_string())
        );
    }

    #[test]
    fn extract_url_invalid() {
        assert!(DuckDuckGoEngine::extract_url("not-a-url").is_none());
        assert!(DuckDuckGoEngine::extract_url("//duckduckgo.com/l/?rut=only").is_none());
    }

    #[test]
    fn parse_mock_html_skips_ads_and_unwraps_redirects() {
        let results = parse_duckduckgo_html(MOCK_DDG_HTML, 10).expect("should parse");
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Welcome to Python.org");
        assert_eq!(results[0].url, "https://www.python.org/");
        assert!(results[0].snippet.contains("official home"));
        assert_eq!(results[0].engine, "DuckDuckGo");
        assert_eq!(results[0].engine_rank, 1);

        assert_eq!(results[1].url, "https://docs.python.org/3/tutorial/");
        assert_eq!(results[1].engine_rank, 2);

        assert!(results[2].url.contains("wikipedia.org"));
        assert!(results[2].snippet.is_empty());
    }

    #[test]
    fn parse_respects_limit() {
        let results = parse_duckduckgo_html(MOCK_DDG_HTML, 2).expect("should parse");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        let results = parse_duckduckgo_html("<html><body></body></html>", 10).expect("should parse");
        assert!(results.is_empty());
    }
}
