//! Application settings: a TOML file plus credentials from the environment.
//!
//! The file mirrors [`SearchConfig`] under a `[search]` table. Every field
//! is optional; a missing file means all defaults. API credentials are
//! never read from or written to the file.
//!
//! ```toml
//! [search]
//! wait_budget_ms = 5000
//!
//! [search.rank]
//! strategy = "smart"
//!
//! [search.quota.services.google]
//! limit = 50
//! period = "daily"
//! ```

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use websearch_core::{QuotaPeriod, SearchConfig, ServiceQuota};

use crate::error::{AppError, Result};

/// Google Custom Search API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_CSE_API_KEY";
/// Google Programmable Search Engine ID.
pub const GOOGLE_CSE_ID_ENV: &str = "GOOGLE_CSE_ID";
/// Brave Search API subscription token.
pub const BRAVE_API_KEY_ENV: &str = "BRAVE_SEARCH_API_KEY";
/// Override for the Google daily request limit.
pub const GOOGLE_QUOTA_ENV: &str = "GOOGLE_DAILY_QUOTA";
/// Override for the Brave monthly request limit.
pub const BRAVE_QUOTA_ENV: &str = "BRAVE_MONTHLY_QUOTA";

/// API credentials for the metered providers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Google Custom Search API key.
    pub google_api_key: Option<String>,
    /// Google Programmable Search Engine ID.
    pub google_cse_id: Option<String>,
    /// Brave Search API key.
    pub brave_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_cse_id", &redact(&self.google_cse_id))
            .field("brave_api_key", &redact(&self.brave_api_key))
            .finish()
    }
}

impl Credentials {
    /// Whether both Google values are present.
    pub fn has_google(&self) -> bool {
        self.google_api_key.is_some() && self.google_cse_id.is_some()
    }

    /// Whether a Brave key is present.
    pub fn has_brave(&self) -> bool {
        self.brave_api_key.is_some()
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Search core configuration.
    pub search: SearchConfig,
    /// Credentials, environment only.
    #[serde(skip)]
    pub credentials: Credentials,
}

impl AppSettings {
    /// Parse settings from TOML text. Credentials are left empty.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the text is not valid TOML for this shape.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load settings from `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path`, apply the process environment, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or malformed, an
    /// override variable is not a number, or validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save the file portion of these settings, creating parent directories.
    ///
    /// Written atomically (temp file → fsync → rename), so a crash mid-write
    /// leaves the previous file in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialised or written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("failed to serialize settings: {e}")))?;
        write_text_atomic(path, &content)
    }

    /// Fill credentials and quota overrides from `lookup`.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] naming the variable if a quota override
    /// is not a non-negative integer.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        self.credentials = Credentials {
            google_api_key: get(GOOGLE_API_KEY_ENV),
            google_cse_id: get(GOOGLE_CSE_ID_ENV),
            brave_api_key: get(BRAVE_API_KEY_ENV),
        };

        for (name, service, period) in [
            (GOOGLE_QUOTA_ENV, "google", QuotaPeriod::Daily),
            (BRAVE_QUOTA_ENV, "brave", QuotaPeriod::Monthly),
        ] {
            let Some(raw) = get(name) else { continue };
            let limit: u32 = raw
                .parse()
                .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer, got '{raw}'")))?;
            self.search
                .quota
                .services
                .entry(service.to_string())
                .and_modify(|q| q.limit = limit)
                .or_insert(ServiceQuota { limit, period });
            tracing::debug!(service, limit, "quota limit overridden from environment");
        }
        Ok(())
    }

    /// Validate the search configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field as [`AppError::Search`].
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        Ok(())
    }
}

/// Write `text` to `path` via a sibling `.toml.tmp` file.
fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use websearch_core::DedupStrategy;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_toml_is_default() {
        let settings = AppSettings::from_toml_str("").expect("parse");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn partial_toml_overrides_named_fields() {
        let settings = AppSettings::from_toml_str(
            r#"
            [search]
            wait_budget_ms = 3000
            request_delay_ms = [0, 50]

            [search.rank]
            strategy = "smart"
            max_per_domain = 3

            [search.cache]
            ttl_seconds = 60
            "#,
        )
        .expect("parse");
        assert_eq!(settings.search.wait_budget_ms, 3000);
        assert_eq!(settings.search.request_delay_ms, (0, 50));
        assert_eq!(settings.search.rank.strategy, DedupStrategy::Smart);
        assert_eq!(settings.search.rank.max_per_domain, 3);
        assert_eq!(settings.search.cache.ttl_seconds, 60);
        assert_eq!(settings.search.cache.capacity, 500);
        assert_eq!(settings.search.timeout_seconds, 6);
    }

    #[test]
    fn unknown_strategy_is_config_error() {
        let err = AppSettings::from_toml_str("[search.rank]\nstrategy = \"fuzzy\"").unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = AppSettings::from_file(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("websearch.toml");
        let mut settings = AppSettings::default();
        settings.search.wait_budget_ms = 4500;
        settings.search.rank.strategy = DedupStrategy::Compare;
        settings.credentials.brave_api_key = Some("secret".into());
        settings.save_to_file(&path).expect("save");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(!text.contains("secret"));

        let loaded = AppSettings::from_file(&path).expect("load");
        assert_eq!(loaded.search, settings.search);
        assert_eq!(loaded.credentials, Credentials::default());
    }

    #[test]
    fn save_replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("websearch.toml");
        std::fs::write(&path, "[search]\nwait_budget_ms = 1000\n").expect("seed");

        let mut settings = AppSettings::default();
        settings.search.wait_budget_ms = 2500;
        settings.save_to_file(&path).expect("save");

        assert_eq!(AppSettings::from_file(&path).expect("load").search.wait_budget_ms, 2500);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn save_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("websearch.toml");
        std::fs::write(&path, "[search]\nwait_budget_ms = 1000\n").expect("seed");
        // A directory squatting on the temp path makes the write fail before rename.
        std::fs::create_dir(path.with_extension("toml.tmp")).expect("block temp path");

        let mut settings = AppSettings::default();
        settings.search.wait_budget_ms = 2500;
        assert!(settings.save_to_file(&path).is_err());
        assert_eq!(AppSettings::from_file(&path).expect("load").search.wait_budget_ms, 1000);
    }

    #[test]
    fn credentials_from_environment() {
        let mut settings = AppSettings::default();
        settings
            .apply_env(env(&[
                (GOOGLE_API_KEY_ENV, "g-key"),
                (GOOGLE_CSE_ID_ENV, "g-cx"),
                (BRAVE_API_KEY_ENV, "   "),
            ]))
            .expect("apply");
        assert!(settings.credentials.has_google());
        assert!(!settings.credentials.has_brave());
    }

    #[test]
    fn quota_overrides_from_environment() {
        let mut settings = AppSettings::default();
        settings
            .apply_env(env(&[(GOOGLE_QUOTA_ENV, "25"), (BRAVE_QUOTA_ENV, "0")]))
            .expect("apply");
        let services = &settings.search.quota.services;
        assert_eq!(services["google"].limit, 25);
        assert_eq!(services["google"].period, QuotaPeriod::Daily);
        assert_eq!(services["brave"].limit, 0);
        assert_eq!(services["brave"].period, QuotaPeriod::Monthly);
    }

    #[test]
    fn override_keeps_configured_period() {
        let mut settings = AppSettings::from_toml_str(
            "[search.quota.services.google]\nlimit = 10\nperiod = \"monthly\"",
        )
        .expect("parse");
        settings.apply_env(env(&[(GOOGLE_QUOTA_ENV, "40")])).expect("apply");
        let google = &settings.search.quota.services["google"];
        assert_eq!(google.limit, 40);
        assert_eq!(google.period, QuotaPeriod::Monthly);
    }

    #[test]
    fn non_numeric_quota_override_rejected() {
        let mut settings = AppSettings::default();
        let err = settings.apply_env(env(&[(BRAVE_QUOTA_ENV, "lots")])).unwrap_err();
        assert!(err.to_string().contains(BRAVE_QUOTA_ENV));
    }

    #[test]
    fn validation_surfaces_core_errors() {
        let mut settings = AppSettings::default();
        settings.search.timeout_seconds = 0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AppError::Search(_)));
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn debug_redacts_credentials() {
        let credentials = Credentials {
            google_api_key: Some("very-secret".into()),
            ..Default::default()
        };
        let shown = format!("{credentials:?}");
        assert!(!shown.contains("very-secret"));
        assert!(shown.contains("<redacted>"));
    }
}
