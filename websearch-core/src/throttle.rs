//! Per-provider politeness delays.
//!
//! Before each call a scraped engine waits until `base + jitter` has
//! passed since its previous call. The delay is measured per provider
//! name, so engines never slow each other down.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::SearchConfig;

/// Spacing between calls to the same provider.
#[derive(Debug)]
pub struct Throttle {
    base: Duration,
    jitter: Duration,
    last_call: Mutex<HashMap<String, Instant>>,
}

impl Throttle {
    /// A throttle with a fixed `base` delay plus up to `jitter` random extra.
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base,
            jitter,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    /// Build from `request_delay_ms = (min, max)`: base `min`, jitter `max - min`.
    pub fn from_config(config: &SearchConfig) -> Self {
        let (min, max) = config.request_delay_ms;
        Self::new(
            Duration::from_millis(min),
            Duration::from_millis(max.saturating_sub(min)),
        )
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Reserve the next call slot for `provider` and return how long the
    /// caller must wait before making it.
    pub fn reserve(&self, provider: &str) -> Duration {
        let spacing = self.base + self.sample_jitter();
        let now = Instant::now();
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);

        let wait = match last_call.get(provider) {
            Some(&previous) => (previous + spacing).saturating_duration_since(now),
            None => Duration::ZERO,
        };
        last_call.insert(provider.to_string(), now + wait);
        wait
    }

    /// Sleep until `provider` may be called again.
    pub async fn wait(&self, provider: &str) {
        let wait = self.reserve(provider);
        if !wait.is_zero() {
            tracing::debug!(provider, wait_ms = wait.as_millis() as u64, "politeness delay");
            tokio::time::sleep(wait).await;
        }
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let max = self.jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}
