//! Plumbing shared by the HTML-scraped engines: one configured client,
//! the politeness throttle, and a layout-driven result parser.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::throttle::Throttle;
use crate::types::ResultRecord;

/// CSS selectors describing one result-page layout.
///
/// The link is the `href` of the first `<a>` inside the title element, or
/// of the title element itself when it is the anchor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResultLayout {
    pub container: &'static str,
    pub title: &'static str,
    pub snippet: &'static str,
}

/// Client state every scraped engine carries.
#[derive(Debug, Clone)]
pub(crate) struct HtmlClient {
    pub client: reqwest::Client,
    pub base_url: String,
    pub safe_search: bool,
    throttle: Arc<Throttle>,
}

impl HtmlClient {
    pub fn new(
        config: &SearchConfig,
        throttle: Arc<Throttle>,
        base_url: &str,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            safe_search: config.safe_search,
            throttle,
        })
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    /// Wait out the politeness delay, send `request` and return the body.
    pub async fn fetch(
        &self,
        engine: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, SearchError> {
        self.throttle.wait(engine).await;

        let response = request
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| http::request_error(engine, e))?;
        http::check_status(engine, response.status())?;

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("{engine} response read failed: {e}")))?;
        tracing::trace!(engine, bytes = html.len(), "response received");
        Ok(html)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector '{css}': {e:?}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a results page using the first layout that matches any container.
///
/// `resolve_url` turns a raw `href` into the final URL, or rejects it.
/// Records get consecutive 1-based ranks in page order.
pub(crate) fn parse_results(
    html: &str,
    layouts: &[ResultLayout],
    engine: &str,
    limit: usize,
    resolve_url: impl Fn(&str) -> Option<String>,
) -> Result<Vec<ResultRecord>, SearchError> {
    let document = Html::parse_document(html);
    let link_sel = selector("a")?;
    let mut results = Vec::new();

    for layout in layouts {
        let container_sel = selector(layout.container)?;
        let title_sel = selector(layout.title)?;
        let snippet_sel = selector(layout.snippet)?;

        let mut containers = document.select(&container_sel).peekable();
        if containers.peek().is_none() {
            continue;
        }

        for element in containers {
            let Some(title_el) = element.select(&title_sel).next() else {
                continue;
            };
            let title = text_of(title_el);
            if title.is_empty() {
                continue;
            }

            let href = title_el
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .or_else(|| title_el.value().attr("href"));
            let Some(url) = href.and_then(&resolve_url) else {
                continue;
            };

            let snippet = element
                .select(&snippet_sel)
                .next()
                .map(text_of)
                .unwrap_or_default();

            let rank = results.len() + 1;
            results.push(ResultRecord::new(title, url, snippet, engine, rank));
            if results.len() >= limit {
                break;
            }
        }
        break;
    }

    tracing::debug!(engine, count = results.len(), "results parsed");
    Ok(results)
}

/// Accept absolute `http(s)` links only.
pub(crate) fn absolute_http(href: &str) -> Option<String> {
    let parsed = url::Url::parse(href).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| href.to_string())
}
