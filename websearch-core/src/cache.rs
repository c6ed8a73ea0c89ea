//! In-memory LRU cache with per-entry TTL and compressed payloads.
//!
//! Values are serialised with `serde_json` and, when compression is on,
//! gzip-compressed before storage. Reads decompress transparently. One
//! mutex guards the whole structure; search volumes are low enough that
//! lock contention never dominates provider latency.
//!
//! Expiry is checked lazily on [`ResultCache::get`] and in bulk by
//! [`ResultCache::clear_expired`], which callers run before starting new
//! work. There is no background sweeper.

use std::hash::Hash;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::SearchError;

/// Cache sizing and expiry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries before the least recently used is evicted.
    pub capacity: usize,
    /// Entry lifetime in seconds. Set to 0 to disable result caching.
    pub ttl_seconds: u64,
    /// Whether payloads are gzip-compressed in memory.
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            ttl_seconds: 300,
            compress: true,
        }
    }
}

impl CacheConfig {
    /// Whether the façade should consult the cache at all.
    pub fn enabled(&self) -> bool {
        self.ttl_seconds > 0
    }

    /// Validates the cache section.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.capacity == 0 {
            return Err(SearchError::Config(
                "cache capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Cache key for a search: trimmed, lowercased query plus result count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    requested_count: usize,
}

impl CacheKey {
    /// Build a deterministic key. `"  Rust "` and `"rust"` map to the same key.
    pub fn new(query: &str, requested_count: usize) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            requested_count,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Live entries (expired entries not yet swept are included).
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Lookups that returned a value.
    pub hits: u64,
    /// All lookups.
    pub requests: u64,
    /// `hits / requests`, 0.0 before the first lookup.
    pub hit_rate: f64,
    /// Whether payloads are compressed.
    pub compression_enabled: bool,
}

struct CacheEntry {
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
}

struct CacheState<K: Hash + Eq> {
    entries: LruCache<K, CacheEntry>,
    hits: u64,
    requests: u64,
}

/// A bounded, recency-ordered, TTL-limited store of serialisable values.
pub struct ResultCache<K: Hash + Eq, V> {
    state: Mutex<CacheState<K>>,
    ttl: Duration,
    compress: bool,
    clock: Arc<dyn Clock>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> ResultCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Serialize + DeserializeOwned,
{
    /// Create an empty cache. A zero capacity is treated as 1.
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let ttl_seconds = i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                requests: 0,
            }),
            ttl: Duration::try_seconds(ttl_seconds).unwrap_or(Duration::MAX),
            compress: config.compress,
            clock,
            _value: PhantomData,
        }
    }

    /// Look up `key`. Expired or undecodable entries are removed and
    /// reported as absent. A hit marks the entry most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.requests += 1;

        let expired = self.is_expired(state.entries.peek(key)?, now);
        if expired {
            state.entries.pop(key);
            return None;
        }

        let decoded = state.entries.get(key).map(|entry| self.decode(&entry.payload))?;
        match decoded {
            Ok(value) => {
                state.hits += 1;
                Some(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, "evicting undecodable cache entry");
                state.entries.pop(key);
                None
            }
        }
    }

    /// Store `value` under `key`, evicting the least recently used entry
    /// if the cache is full. Encoding failures are logged and dropped.
    /// A zero TTL disables storage.
    pub fn set(&self, key: K, value: &V) {
        if self.ttl.is_zero() {
            return;
        }
        let payload = match self.encode(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "cache payload encoding failed, not caching");
                return;
            }
        };
        let entry = CacheEntry {
            payload,
            created_at: self.clock.now(),
        };
        self.lock().entries.put(key, entry);
    }

    /// Remove every expired entry and return how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.lock();
        let expired: Vec<K> = guard
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            guard.entries.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let guard = self.lock();
        let hit_rate = if guard.requests == 0 {
            0.0
        } else {
            guard.hits as f64 / guard.requests as f64
        };
        CacheStats {
            size: guard.entries.len(),
            capacity: guard.entries.cap().get(),
            hits: guard.hits,
            requests: guard.requests,
            hit_rate,
            compression_enabled: self.compress,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.created_at) > self.ttl
    }

    fn encode(&self, value: &V) -> Result<Vec<u8>, SearchError> {
        let json = serde_json::to_vec(value)
            .map_err(|e| SearchError::Cache(format!("serialize failed: {e}")))?;
        if !self.compress {
            return Ok(json);
        }
        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| SearchError::Cache(format!("compress failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| SearchError::Cache(format!("compress failed: {e}")))
    }

    fn decode(&self, payload: &[u8]) -> Result<V, SearchError> {
        if !self.compress {
            return serde_json::from_slice(payload)
                .map_err(|e| SearchError::Cache(format!("deserialize failed: {e}")));
        }
        let mut json = Vec::new();
        GzDecoder::new(payload)
            .read_to_end(&mut json)
            .map_err(|e| SearchError::Cache(format!("decompress failed: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| SearchError::Cache(format!("deserialize failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
            .single()
            .expect("valid date")
    }

    fn make_cache(capacity: usize, ttl_seconds: u64, compress: bool) -> (ResultCache<String, Vec<String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let config = CacheConfig {
            capacity,
            ttl_seconds,
            compress,
        };
        (ResultCache::new(&config, clock.clone()), clock)
    }

    fn value(text: &str) -> Vec<String> {
        vec![text.to_string(), format!("{text}-2")]
    }

    #[test]
    fn cache_key_normalises_query_case_and_whitespace() {
        assert_eq!(CacheKey::new("  RUST Programming ", 5), CacheKey::new("rust programming", 5));
    }

    #[test]
    fn cache_key_differs_by_count() {
        assert_ne!(CacheKey::new("rust", 5), CacheKey::new("rust", 10));
    }

    #[test]
    fn set_then_get_round_trips() {
        let (cache, _clock) = make_cache(10, 300, true);
        cache.set("k".into(), &value("a"));
        assert_eq!(cache.get(&"k".to_string()), Some(value("a")));
    }

    #[test]
    fn uncompressed_round_trip() {
        let (cache, _clock) = make_cache(10, 300, false);
        cache.set("k".into(), &value("plain"));
        assert_eq!(cache.get(&"k".to_string()), Some(value("plain")));
        assert!(!cache.stats().compression_enabled);
    }

    #[test]
    fn miss_returns_none() {
        let (cache, _clock) = make_cache(10, 300, true);
        assert!(cache.get(&"absent".to_string()).is_none());
    }

    #[test]
    fn entry_valid_until_ttl_then_absent() {
        let (cache, clock) = make_cache(10, 300, true);
        cache.set("k".into(), &value("a"));

        clock.advance(Duration::seconds(300));
        assert!(cache.get(&"k".to_string()).is_some(), "exactly ttl is still valid");

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&"k".to_string()).is_none());
        assert!(cache.is_empty(), "expired entry is deleted on read");
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let (cache, _clock) = make_cache(2, 300, true);
        cache.set("a".into(), &value("a"));
        cache.set("b".into(), &value("b"));

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(cache.get(&"a".to_string()).is_some());
        cache.set("c".into(), &value("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"a".to_string()).is_some());
        assert!(cache.get(&"b".to_string()).is_none());
        assert!(cache.get(&"c".to_string()).is_some());
    }

    #[test]
    fn overwrite_same_key_updates_value() {
        let (cache, _clock) = make_cache(2, 300, true);
        cache.set("k".into(), &value("old"));
        cache.set("k".into(), &value("new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"k".to_string()), Some(value("new")));
    }

    #[test]
    fn clear_expired_counts_removed_entries() {
        let (cache, clock) = make_cache(10, 60, true);
        cache.set("old-1".into(), &value("1"));
        cache.set("old-2".into(), &value("2"));
        clock.advance(Duration::seconds(45));
        cache.set("fresh".into(), &value("3"));
        clock.advance(Duration::seconds(30));

        assert_eq!(cache.clear_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear_expired(), 0);
    }

    #[test]
    fn corrupt_entry_is_evicted_and_absent() {
        let (cache, _clock) = make_cache(10, 300, true);
        cache.lock().entries.put(
            "bad".to_string(),
            CacheEntry {
                payload: vec![0x1f, 0x8b, 0x00, 0x01],
                created_at: start(),
            },
        );
        assert!(cache.get(&"bad".to_string()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn compression_shrinks_repetitive_payloads() {
        let (cache, _clock) = make_cache(10, 300, true);
        let big: Vec<String> = (0..200).map(|_| "the same snippet text".to_string()).collect();
        let raw = serde_json::to_vec(&big).expect("serialize").len();
        let stored = cache.encode(&big).expect("encode").len();
        assert!(stored < raw / 4, "stored {stored} bytes vs raw {raw}");
    }

    #[test]
    fn stats_track_hits_and_requests() {
        let (cache, _clock) = make_cache(10, 300, true);
        cache.set("k".into(), &value("a"));
        let _ = cache.get(&"k".to_string());
        let _ = cache.get(&"missing".to_string());

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 10);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.requests, 2);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn concurrent_set_and_get_are_safe() {
        let (cache, _clock) = make_cache(64, 300, true);
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("t{t}-{}", i % 8);
                        cache.set(key.clone(), &value(&key));
                        if let Some(v) = cache.get(&key) {
                            assert_eq!(v[0], key);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert!(cache.len() <= 64);
    }

    #[test]
    fn zero_capacity_config_rejected() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let config = CacheConfig {
            ttl_seconds: 0,
            ..Default::default()
        };
        assert!(!config.enabled());
        assert!(CacheConfig::default().enabled());

        let (cache, _clock) = make_cache(10, 0, true);
        cache.set("rust".to_string(), &value("a"));
        assert!(cache.is_empty());
        assert!(cache.get(&"rust".to_string()).is_none());
    }
}
