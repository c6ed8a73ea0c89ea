//! Cross-process usage accounting for metered search APIs.
//!
//! Every metered service has a fixed request limit per period (daily or
//! monthly, UTC). Usage for all services lives in one JSON file that is
//! shared by every process on the host, e.g. an interactive invocation and
//! a long-running daemon.
//!
//! # Consistency
//!
//! A read-modify-write cycle holds an in-process mutex and an advisory
//! exclusive `flock(2)` on a sibling `.lock` file, and finishes with an
//! atomic replace (temp file → fsync → rename). This gives lost-update
//! freedom between processes on one host. It is not a distributed lock.
//! The lock can block, so async code goes through [`QuotaLedger::check`]
//! and [`QuotaLedger::charge`], which run on tokio's blocking pool.
//!
//! # Failure semantics
//!
//! A missing or malformed ledger reads as "nothing used". Write failures
//! are logged and the call proceeds as if the write never happened.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::SearchError;

/// How often a service's counter resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPeriod {
    /// Resets at each UTC midnight.
    Daily,
    /// Resets on the first day of each UTC month.
    Monthly,
}

impl QuotaPeriod {
    /// The period key for `now`: `YYYY-MM-DD` or `YYYY-MM`.
    pub fn key(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Daily => now.format("%Y-%m-%d").to_string(),
            Self::Monthly => now.format("%Y-%m").to_string(),
        }
    }

    /// Lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

/// Limit and period for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceQuota {
    /// Requests allowed per period.
    pub limit: u32,
    /// Reset granularity.
    pub period: QuotaPeriod,
}

/// Configured limits, keyed by service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Service name → limit and period.
    pub services: BTreeMap<String, ServiceQuota>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            "google".to_string(),
            ServiceQuota {
                limit: 100,
                period: QuotaPeriod::Daily,
            },
        );
        services.insert(
            "brave".to_string(),
            ServiceQuota {
                limit: 2000,
                period: QuotaPeriod::Monthly,
            },
        );
        Self { services }
    }
}

impl QuotaConfig {
    /// Validates the quota section.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.services.keys().any(|name| name.trim().is_empty()) {
            return Err(SearchError::Config(
                "quota service names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Whether a service may still be called this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaState {
    /// `used < limit`.
    Available,
    /// `used >= limit`.
    Exhausted,
}

/// Usage report for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    /// Requests recorded in the current period.
    pub used: u32,
    /// Configured limit.
    pub limit: u32,
    /// Reset granularity.
    pub period: QuotaPeriod,
    /// `limit - used`, floored at 0.
    pub remaining: u32,
    /// Derived availability.
    pub status: QuotaState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    services: BTreeMap<String, StoredUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUsage {
    period_key: String,
    used: u32,
}

/// File-backed quota ledger shared by all processes on the host.
pub struct QuotaLedger {
    path: PathBuf,
    config: QuotaConfig,
    clock: Arc<dyn Clock>,
    guard: Mutex<()>,
}

impl QuotaLedger {
    /// Create a ledger persisted at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>, config: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            config,
            clock,
            guard: Mutex::new(()),
        }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `service` may make another request this period.
    ///
    /// Unknown services are always allowed. Observing a period rollover
    /// persists the reset.
    pub fn can_make_request(&self, service: &str) -> bool {
        let Some(quota) = self.config.services.get(service) else {
            return true;
        };
        let current = quota.period.key(self.clock.now());

        self.locked(|| {
            let mut ledger = read_ledger(&self.path);
            let used = match ledger.services.get(service) {
                Some(stored) if stored.period_key == current => stored.used,
                Some(_) => {
                    tracing::info!(service, period = %current, "quota period rolled over");
                    ledger.services.insert(
                        service.to_string(),
                        StoredUsage {
                            period_key: current.clone(),
                            used: 0,
                        },
                    );
                    self.persist(&ledger);
                    0
                }
                None => 0,
            };
            used < quota.limit
        })
    }

    /// Count one successful request against `service`.
    ///
    /// Unknown services are not recorded.
    pub fn record_request(&self, service: &str) {
        let Some(quota) = self.config.services.get(service) else {
            return;
        };
        let current = quota.period.key(self.clock.now());

        self.locked(|| {
            let mut ledger = read_ledger(&self.path);
            let entry = ledger
                .services
                .entry(service.to_string())
                .or_insert_with(|| StoredUsage {
                    period_key: current.clone(),
                    used: 0,
                });
            if entry.period_key != current {
                entry.period_key = current.clone();
                entry.used = 0;
            }
            entry.used = entry.used.saturating_add(1);
            let used = entry.used;
            self.persist(&ledger);
            tracing::info!(service, used, limit = quota.limit, "API usage recorded");
        });
    }

    /// Usage for `service`, or `None` if it is not a configured service.
    pub fn usage(&self, service: &str) -> Option<QuotaUsage> {
        let quota = self.config.services.get(service)?;
        let current = quota.period.key(self.clock.now());
        let ledger = self.locked(|| read_ledger(&self.path));
        Some(usage_for(quota, &ledger, service, &current))
    }

    /// Usage for every configured service.
    pub fn status(&self) -> BTreeMap<String, QuotaUsage> {
        let now = self.clock.now();
        let ledger = self.locked(|| read_ledger(&self.path));
        self.config
            .services
            .iter()
            .map(|(service, quota)| {
                let current = quota.period.key(now);
                (service.clone(), usage_for(quota, &ledger, service, &current))
            })
            .collect()
    }

    /// [`can_make_request`](Self::can_make_request) on the blocking pool.
    ///
    /// The file lock may be held by another process, so async callers use
    /// this instead of blocking a runtime worker. A failed blocking task
    /// denies the request.
    pub async fn check(self: &Arc<Self>, service: &str) -> bool {
        let ledger = Arc::clone(self);
        let service = service.to_string();
        match tokio::task::spawn_blocking(move || ledger.can_make_request(&service)).await {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::error!(error = %err, "quota check task failed");
                false
            }
        }
    }

    /// [`record_request`](Self::record_request) on the blocking pool.
    pub async fn charge(self: &Arc<Self>, service: &str) {
        let ledger = Arc::clone(self);
        let service = service.to_string();
        if let Err(err) = tokio::task::spawn_blocking(move || ledger.record_request(&service)).await
        {
            tracing::error!(error = %err, "quota charge task failed");
        }
    }

    fn locked<T>(&self, f: impl FnOnce() -> T) -> T {
        let _process = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _file = match FileLock::acquire(&self.path.with_extension("lock")) {
            Ok(lock) => Some(lock),
            Err(err) => {
                tracing::warn!(error = %err, "quota lock unavailable, continuing unlocked");
                None
            }
        };
        f()
    }

    fn persist(&self, ledger: &LedgerFile) {
        if let Err(err) = write_ledger_atomic(&self.path, ledger) {
            tracing::error!(path = %self.path.display(), error = %err, "failed to save quota ledger");
        }
    }
}

fn usage_for(quota: &ServiceQuota, ledger: &LedgerFile, service: &str, current: &str) -> QuotaUsage {
    let used = ledger
        .services
        .get(service)
        .filter(|stored| stored.period_key == current)
        .map_or(0, |stored| stored.used);
    QuotaUsage {
        used,
        limit: quota.limit,
        period: quota.period,
        remaining: quota.limit.saturating_sub(used),
        status: if used < quota.limit {
            QuotaState::Available
        } else {
            QuotaState::Exhausted
        },
    }
}

fn read_ledger(path: &Path) -> LedgerFile {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LedgerFile::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read quota ledger");
            return LedgerFile::default();
        }
    };
    match serde_json::from_slice::<LedgerFile>(&bytes) {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed quota ledger");
            LedgerFile::default()
        }
    }
}

/// Write the ledger to a temp file and atomically rename it over `path`.
fn write_ledger_atomic(path: &Path, ledger: &LedgerFile) -> Result<(), SearchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SearchError::Persistence(format!(
                "failed to create quota directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let json = serde_json::to_vec_pretty(ledger)
        .map_err(|e| SearchError::Persistence(format!("failed to serialize quota ledger: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    let mut file = File::create(&tmp_path).map_err(|e| {
        SearchError::Persistence(format!(
            "failed to create temp file '{}': {e}",
            tmp_path.display()
        ))
    })?;
    restrict_permissions(&tmp_path);
    file.write_all(&json)
        .map_err(|e| SearchError::Persistence(format!("failed to write temp file: {e}")))?;
    file.sync_all()
        .map_err(|e| SearchError::Persistence(format!("failed to sync temp file: {e}")))?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        SearchError::Persistence(format!(
            "failed to rename '{}' to '{}': {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;
    restrict_permissions(path);
    Ok(())
}

/// Owner read/write only; the ledger may sit next to credentials.
fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Exclusive advisory lock held for the lifetime of the value.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, SearchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SearchError::Persistence(format!("failed to create lock directory: {e}"))
            })?;
        }
        let mut options = OpenOptions::new();
        options.create(true).truncate(false).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(|e| {
            SearchError::Persistence(format!("failed to open lock file '{}': {e}", path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: the descriptor is owned by `file` and stays open while locked.
            let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if ret != 0 {
                return Err(SearchError::Persistence(format!(
                    "flock failed: {}",
                    std::io::Error::last_os_error()
                )));
            }
        }
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: same descriptor as in `acquire`; closing would also release it.
            let _ = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        }
    }
}
