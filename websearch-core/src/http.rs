//! Shared HTTP client construction and response-status mapping.
//!
//! Scraped engines get a browser-like client with cookies and a rotating
//! User-Agent. API engines use the same builder; their endpoints ignore
//! the browser headers.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::StatusCode;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Realistic browser User-Agent strings, picked at random per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for search requests.
///
/// Cookies are kept (consent pages), the per-request timeout comes from
/// `config.timeout_seconds`, and the User-Agent is `config.user_agent` or
/// a random entry from the built-in list.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

/// Map a transport error to [`SearchError`], keeping timeouts distinct.
pub fn request_error(engine: &str, err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout(format!("{engine} request timed out"))
    } else {
        SearchError::Http(format!("{engine} request failed: {err}"))
    }
}

/// Fail on any non-success status.
///
/// # Errors
///
/// Returns [`SearchError::Http`] naming the engine and status.
pub fn check_status(engine: &str, status: StatusCode) -> Result<(), SearchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SearchError::Http(format!("{engine} returned HTTP {status}")))
    }
}
