//! Page content fetching: download a page and reduce it to readable text.
//!
//! Extraction walks the parsed DOM and skips boilerplate elements
//! (scripts, styles, navigation, headers, footers, asides, embedded
//! frames). It reads the first `article`, `main` or `[role="main"]` region
//! that has text and falls back to `<body>`.
//!
//! Fetching never fails as a whole. Every URL yields a [`PageFetch`] whose
//! outcome is either the extracted content or a classified failure with a
//! troubleshooting hint, so a batch with one bad URL still returns the rest.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::ResultCache;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;

/// Default maximum characters of extracted text.
pub const DEFAULT_MAX_CHARS: usize = 50_000;

const TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Elements dropped together with everything inside them.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe",
    "template",
];

/// Elements that start a new line of text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "section", "article", "main", "blockquote", "pre", "dd", "dt",
];

/// Candidate content roots, most specific first.
const CONTENT_ROOTS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Settings for page fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Per-page HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Extracted text is cut at this many characters.
    pub max_chars: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl ContentConfig {
    /// Validates the content section.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "content.timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_chars == 0 {
            return Err(SearchError::Config(
                "content.max_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Readable text extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// The page URL as requested.
    pub url: String,
    /// Text of the `<title>` element, or empty.
    pub title: String,
    /// Extracted text, one block per line.
    pub text: String,
    /// Words in `text`, not counting the truncation marker.
    pub word_count: usize,
    /// Characters in `text`.
    pub content_length: usize,
    /// Whether `text` was cut at the character limit.
    pub truncated: bool,
}

/// Broad cause of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// The page did not respond in time.
    #[serde(rename = "timeout")]
    Timeout,
    /// No connection could be made.
    #[serde(rename = "connection")]
    Connection,
    /// The server answered with a 4xx status.
    #[serde(rename = "http_4xx")]
    Http4xx,
    /// The server answered with a 5xx status.
    #[serde(rename = "http_5xx")]
    Http5xx,
    /// The page had no extractable text.
    #[serde(rename = "parse")]
    Parse,
    /// Anything else, including invalid URLs.
    #[serde(rename = "general")]
    General,
}

impl FetchErrorKind {
    /// A short suggestion for the person who asked for the page.
    pub fn troubleshooting(&self) -> &'static str {
        match self {
            Self::Timeout => {
                "The website took too long to respond. Try again later or check that the URL is correct."
            }
            Self::Connection => {
                "Could not connect to the website. Check the network connection or whether the site is down."
            }
            Self::Http4xx => {
                "The server returned a client error (4xx). The URL may be wrong or access may be restricted."
            }
            Self::Http5xx => {
                "The server returned a server error (5xx). The site may be having problems, try again later."
            }
            Self::Parse => {
                "Could not extract readable text. The page may rely on scripts or an unsupported format."
            }
            Self::General => "An unexpected error occurred. Check the URL and try again later.",
        }
    }
}

/// Why a page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Classified cause.
    pub kind: FetchErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Suggestion matching `kind`.
    pub troubleshooting: String,
}

impl FetchFailure {
    fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            troubleshooting: kind.troubleshooting().to_string(),
        }
    }
}

/// Result of fetching one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    /// Text was extracted.
    Success(PageContent),
    /// The page could not be fetched or had no text.
    Failed(FetchFailure),
}

/// One URL's fetch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFetch {
    /// The URL as requested, trimmed.
    pub url: String,
    /// When the report was produced.
    pub fetched_at: DateTime<Utc>,
    /// Whether the content came from the page cache.
    pub cached: bool,
    /// Content or failure.
    pub outcome: FetchOutcome,
}

impl PageFetch {
    /// Extracted content, if the fetch succeeded.
    pub fn content(&self) -> Option<&PageContent> {
        match &self.outcome {
            FetchOutcome::Success(content) => Some(content),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// The failure, if the fetch failed.
    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Cache of extracted pages keyed by URL. Only successes are stored.
pub type PageCache = ResultCache<String, PageContent>;

/// Downloads pages and extracts their text.
pub struct ContentFetcher {
    client: reqwest::Client,
    max_chars: usize,
    cache: Option<Arc<PageCache>>,
}

impl ContentFetcher {
    /// Create a fetcher using `config.content` for timeout and size limit,
    /// and the rest of `config` for the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client_config = SearchConfig {
            timeout_seconds: config.content.timeout_seconds,
            ..config.clone()
        };
        Ok(Self {
            client: http::build_client(&client_config)?,
            max_chars: config.content.max_chars,
            cache: None,
        })
    }

    /// Serve repeated URLs from `cache`.
    pub fn with_cache(mut self, cache: Arc<PageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetch one page.
    pub async fn fetch(&self, url: &str) -> PageFetch {
        let url = url.trim();
        tracing::trace!(url, "fetching page content");

        let key = url.to_string();
        if let Some(content) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            tracing::debug!("page content served from cache");
            return PageFetch {
                url: key,
                fetched_at: Utc::now(),
                cached: true,
                outcome: FetchOutcome::Success(content),
            };
        }

        let extracted = match self.download(url).await {
            Ok(html) => extract_content_with_limit(&html, url, self.max_chars)
                .map_err(|e| FetchFailure::new(FetchErrorKind::Parse, e.to_string())),
            Err(failure) => Err(failure),
        };

        let outcome = match extracted {
            Ok(content) => {
                tracing::info!(
                    chars = content.content_length,
                    truncated = content.truncated,
                    "page content extracted"
                );
                if let Some(cache) = &self.cache {
                    cache.set(key.clone(), &content);
                }
                FetchOutcome::Success(content)
            }
            Err(failure) => {
                tracing::warn!(kind = ?failure.kind, error = %failure.message, "page fetch failed");
                FetchOutcome::Failed(failure)
            }
        };

        PageFetch {
            url: key,
            fetched_at: Utc::now(),
            cached: false,
            outcome,
        }
    }

    /// Fetch several pages concurrently. Reports come back in input order.
    pub async fn fetch_many<S: AsRef<str>>(&self, urls: &[S]) -> Vec<PageFetch> {
        let reports = join_all(urls.iter().map(|url| self.fetch(url.as_ref()))).await;
        let succeeded = reports.iter().filter(|r| r.content().is_some()).count();
        tracing::info!(requested = urls.len(), succeeded, "batch page fetch complete");
        reports
    }

    async fn download(&self, url: &str) -> Result<String, FetchFailure> {
        let parsed = Url::parse(url)
            .map_err(|e| FetchFailure::new(FetchErrorKind::General, format!("invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchFailure::new(
                FetchErrorKind::General,
                format!("unsupported URL scheme '{}'", parsed.scheme()),
            ));
        }

        let response = self
            .client
            .get(parsed)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(FetchFailure::new(FetchErrorKind::Http4xx, format!("HTTP error {status}")));
        }
        if status.is_server_error() {
            return Err(FetchFailure::new(FetchErrorKind::Http5xx, format!("HTTP error {status}")));
        }
        if !status.is_success() {
            return Err(FetchFailure::new(
                FetchErrorKind::General,
                format!("unexpected HTTP status {status}"),
            ));
        }

        response.text().await.map_err(transport_failure)
    }
}

fn transport_failure(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::new(
            FetchErrorKind::Timeout,
            "request timeout, page took too long to respond",
        )
    } else if err.is_connect() {
        FetchFailure::new(FetchErrorKind::Connection, format!("connection error: {err}"))
    } else {
        FetchFailure::new(FetchErrorKind::General, format!("request error: {err}"))
    }
}

/// Extract readable text from `html` with the default character limit.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the page has no extractable text.
pub fn extract_content(html: &str, url: &str) -> Result<PageContent, SearchError> {
    extract_content_with_limit(html, url, DEFAULT_MAX_CHARS)
}

/// Extract readable text from `html`, cutting it at `max_chars` characters.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the page has no extractable text.
pub fn extract_content_with_limit(
    html: &str,
    url: &str,
    max_chars: usize,
) -> Result<PageContent, SearchError> {
    let document = Html::parse_document(html);
    let title = page_title(&document);
    let text = main_text(&document);
    if text.is_empty() {
        return Err(SearchError::Parse("no extractable content found".into()));
    }

    let (mut text, truncated) = truncate_chars(text, max_chars);
    let word_count = text.split_whitespace().count();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }

    Ok(PageContent {
        url: url.to_string(),
        title,
        content_length: text.chars().count(),
        word_count,
        text,
        truncated,
    })
}

fn page_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn main_text(document: &Html) -> String {
    for css in CONTENT_ROOTS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(root) = document.select(&selector).next() {
            let mut raw = String::new();
            collect_text(root, &mut raw);
            let text = tidy(&raw);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of whitespace inside lines and drop blank lines.
fn tidy(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => (text[..byte_end].trim_end().to_string(), true),
        None => (text, false),
    }
}
