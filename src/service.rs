//! Wires the search façade with the default slot layout, and the page
//! content fetcher.
//!
//! | Slot | Primary | Fallback |
//! |------|---------|----------|
//! | `Google/Startpage` | Google Custom Search API | Startpage |
//! | `Bing/DuckDuckGo` | Bing | DuckDuckGo |
//! | `Brave` | Brave Search API | none |
//!
//! Without Google credentials the first slot runs Startpage alone. Without
//! a Brave key the Brave slot is left out.

use std::sync::Arc;

use anyhow::Context;
use websearch_core::engines::{
    BingEngine, BraveApiEngine, DuckDuckGoEngine, GoogleApiEngine, StartpageEngine,
};
use websearch_core::{
    ContentFetcher, PageCache, QuotaLedger, ResultCache, SearchConfig, Slot, SystemClock,
    Throttle, WebSearch,
};

use crate::error::Result;
use crate::paths::Paths;
use crate::settings::{AppSettings, Credentials};

/// Label of the Google API slot.
pub const GOOGLE_SLOT: &str = "Google/Startpage";
/// Label of the Bing slot.
pub const BING_SLOT: &str = "Bing/DuckDuckGo";
/// Label of the Brave API slot.
pub const BRAVE_SLOT: &str = "Brave";

/// Build the default slots.
///
/// All scraped engines share one throttle, which tracks each engine
/// separately.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built.
pub fn default_slots(
    config: &SearchConfig,
    credentials: &Credentials,
    ledger: Arc<QuotaLedger>,
) -> Result<Vec<Slot>> {
    let throttle = Arc::new(Throttle::from_config(config));
    let mut slots = Vec::with_capacity(3);

    let startpage = Arc::new(StartpageEngine::new(config, throttle.clone())?);
    if credentials.has_google() {
        let google = GoogleApiEngine::new(
            config,
            credentials.google_api_key.clone(),
            credentials.google_cse_id.clone(),
            ledger.clone(),
        )?;
        slots.push(Slot::with_fallback(GOOGLE_SLOT, Arc::new(google), startpage));
    } else {
        tracing::info!("Google API credentials not set, using Startpage only");
        slots.push(Slot::single(GOOGLE_SLOT, startpage));
    }

    let bing = BingEngine::new(config, throttle.clone())?;
    let duckduckgo = DuckDuckGoEngine::new(config, throttle)?;
    slots.push(Slot::with_fallback(
        BING_SLOT,
        Arc::new(bing),
        Arc::new(duckduckgo),
    ));

    if credentials.has_brave() {
        let brave = BraveApiEngine::new(config, credentials.brave_api_key.clone(), ledger)?;
        slots.push(Slot::single(BRAVE_SLOT, Arc::new(brave)));
    } else {
        tracing::info!("Brave API key not set, Brave slot disabled");
    }

    Ok(slots)
}

/// Build the façade from loaded settings, keeping state under `paths`.
///
/// # Errors
///
/// Returns an error if the settings are invalid or a client cannot be built.
pub fn build(settings: &AppSettings, paths: &Paths) -> Result<WebSearch> {
    settings.validate()?;
    let clock = Arc::new(SystemClock);
    let ledger = Arc::new(QuotaLedger::new(
        paths.quota_file(),
        settings.search.quota.clone(),
        clock.clone(),
    ));
    let cache = Arc::new(ResultCache::new(&settings.search.cache, clock));

    let mut builder = WebSearch::builder()
        .config(&settings.search)
        .cache(cache)
        .ledger(ledger.clone());
    for slot in default_slots(&settings.search, &settings.credentials, ledger)? {
        builder = builder.slot(slot);
    }
    let search = builder.build()?;
    tracing::info!(slots = ?search.slot_labels(), "web search ready");
    Ok(search)
}

/// Build a page content fetcher with its own cache, sized like the result cache.
///
/// # Errors
///
/// Returns an error if the settings are invalid or the client cannot be built.
pub fn content_fetcher(settings: &AppSettings) -> Result<ContentFetcher> {
    settings.validate()?;
    let cache = Arc::new(PageCache::new(&settings.search.cache, Arc::new(SystemClock)));
    Ok(ContentFetcher::new(&settings.search)?.with_cache(cache))
}

/// Resolve paths from the environment, load settings and build the façade.
///
/// # Errors
///
/// Returns an error with context if the home directory cannot be prepared,
/// the settings cannot be loaded, or the façade cannot be built.
pub fn open() -> anyhow::Result<WebSearch> {
    let paths = Paths::resolve();
    paths
        .ensure()
        .with_context(|| format!("preparing {}", paths.home().display()))?;
    let config_file = paths.config_file();
    let settings = AppSettings::load(&config_file)
        .with_context(|| format!("loading settings from {}", config_file.display()))?;
    build(&settings, &paths).context("building web search")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(google: bool, brave: bool) -> Credentials {
        Credentials {
            google_api_key: google.then(|| "g-key".to_string()),
            google_cse_id: google.then(|| "g-cx".to_string()),
            brave_api_key: brave.then(|| "b-key".to_string()),
        }
    }

    fn settings(google: bool, brave: bool) -> AppSettings {
        AppSettings {
            credentials: credentials(google, brave),
            ..Default::default()
        }
    }

    #[test]
    fn full_layout_with_all_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let search = build(&settings(true, true), &Paths::from_home(dir.path())).expect("build");
        assert_eq!(search.slot_labels(), vec![GOOGLE_SLOT, BING_SLOT, BRAVE_SLOT]);
    }

    #[test]
    fn brave_slot_dropped_without_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let search = build(&settings(false, false), &Paths::from_home(dir.path())).expect("build");
        assert_eq!(search.slot_labels(), vec![GOOGLE_SLOT, BING_SLOT]);
    }

    #[test]
    fn quota_status_reports_configured_services() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(true, true);
        settings.search.quota.services.get_mut("google").expect("google").limit = 7;
        let search = build(&settings, &Paths::from_home(dir.path())).expect("build");

        let status = search.quota_status();
        assert_eq!(status["google"].limit, 7);
        assert_eq!(status["google"].remaining, 7);
        assert_eq!(status["brave"].used, 0);
    }

    #[test]
    fn invalid_settings_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(false, false);
        settings.search.wait_budget_ms = 0;
        assert!(build(&settings, &Paths::from_home(dir.path())).is_err());
    }

    #[tokio::test]
    async fn content_fetcher_rejects_bad_urls_offline() {
        let fetcher = content_fetcher(&settings(false, false)).expect("fetcher");
        let report = fetcher.fetch("mailto:someone@example.com").await;
        assert!(report.failure().is_some());
    }

    #[test]
    fn content_fetcher_requires_valid_settings() {
        let mut settings = settings(false, false);
        settings.search.content.max_chars = 0;
        assert!(content_fetcher(&settings).is_err());
    }

    #[tokio::test]
    async fn blank_query_needs_no_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let search = build(&settings(false, false), &Paths::from_home(dir.path())).expect("build");
        let response = search.search("   ", 5).await;
        assert_eq!(response.total_results, 0);
        assert!(response.sources.is_empty());
    }
}
