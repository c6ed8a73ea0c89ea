//! On-disk locations for websearch.
//!
//! Everything lives under one home directory:
//!
//! | Purpose | Path |
//! |---------|------|
//! | Settings | `<home>/config/websearch.toml` |
//! | Data | `<home>/data/` |
//! | Quota ledger | `<home>/data/quota/quota.json` |
//! | Logs | `<home>/logs/` |
//!
//! The home defaults to `~/.websearch` and can be overridden with the
//! `WEBSEARCH_HOME` environment variable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable that overrides the home directory.
pub const HOME_ENV: &str = "WEBSEARCH_HOME";

/// Resolved directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// Resolve the home from `WEBSEARCH_HOME` or the platform home directory.
    #[must_use]
    pub fn resolve() -> Self {
        Self::from_override(std::env::var_os(HOME_ENV))
    }

    /// Resolve the home from an explicit override value.
    #[must_use]
    pub fn from_override(override_home: Option<OsString>) -> Self {
        if let Some(home) = override_home.filter(|h| !h.is_empty()) {
            return Self::from_home(home);
        }
        let home = dirs::home_dir()
            .map(|d| d.join(".websearch"))
            .unwrap_or_else(|| PathBuf::from("/tmp/websearch"));
        Self::from_home(home)
    }

    /// Use `home` as the root directory.
    #[must_use]
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Root directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `<home>/config`.
    pub fn config_dir(&self) -> PathBuf {
        self.home.join("config")
    }

    /// `<home>/data`.
    pub fn data_dir(&self) -> PathBuf {
        self.home.join("data")
    }

    /// `<home>/data/quota`.
    pub fn quota_dir(&self) -> PathBuf {
        self.data_dir().join("quota")
    }

    /// `<home>/logs`.
    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Settings file path.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("websearch.toml")
    }

    /// Quota ledger file path.
    pub fn quota_file(&self) -> PathBuf {
        self.quota_dir().join("quota.json")
    }

    /// Create every directory in the layout, owner-only on Unix.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created or its
    /// permissions cannot be set.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.home.clone(),
            self.config_dir(),
            self.data_dir(),
            self.quota_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
            restrict_dir(&dir)?;
        }
        tracing::debug!(home = %self.home.display(), "websearch directories ready");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
