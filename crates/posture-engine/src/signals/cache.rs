//! Scope-keyed signal cache backed by moka.
//!
//! Key: `{signal}:{scope_hash}:{schema_version}`. Freshness is checked at
//! read time against an injectable [`Clock`], so one entry can be fresh
//! for a caller asking for 15 minutes and stale for one asking for 1.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use posture_core::config::SignalConfig;
use posture_core::traits::{Clock, SystemClock};
use serde::Serialize;

use super::types::{EvalScope, SignalResult};

#[derive(Debug, Clone)]
struct CachedSignal {
    result: Arc<SignalResult>,
    fetched_at: Instant,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    /// Percentage, one decimal.
    pub hit_rate: f64,
}

/// In-memory signal cache with per-read freshness windows.
pub struct SignalCache {
    store: Cache<String, CachedSignal>,
    clock: Arc<dyn Clock>,
    default_freshness: Duration,
    schema_version: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SignalCache {
    pub fn new(config: &SignalConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &SignalConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Cache::builder()
            .max_capacity(config.effective_max_entries())
            .build();
        Self {
            store,
            clock,
            default_freshness: config.effective_freshness(),
            schema_version: config.effective_schema_version().to_string(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn key(&self, signal_name: &str, scope: &EvalScope) -> String {
        format!("{}:{}:{}", signal_name, scope.scope_hash(), self.schema_version)
    }

    /// Signal segment of a key built by [`Self::key`]. Signal names may
    /// contain colons, so the scope hash and schema version are peeled off
    /// the right-hand end.
    fn signal_of_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_suffix(self.schema_version.as_str())?
            .strip_suffix(':')?
            .rsplit_once(':')
            .map(|(signal, _hash)| signal)
    }

    pub fn default_freshness(&self) -> Duration {
        self.default_freshness
    }

    /// Cached result if one exists and is within `freshness`.
    pub fn get(
        &self,
        signal_name: &str,
        scope: &EvalScope,
        freshness: Option<Duration>,
    ) -> Option<Arc<SignalResult>> {
        let key = self.key(signal_name, scope);
        let window = freshness.unwrap_or(self.default_freshness);
        match self.store.get(&key) {
            Some(entry) if !self.is_stale(&entry, window) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result)
            }
            Some(_) => {
                self.store.invalidate(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result, replacing any previous entry for the same key.
    pub fn put(&self, signal_name: &str, scope: &EvalScope, result: SignalResult) -> Arc<SignalResult> {
        let result = Arc::new(result);
        self.store.insert(
            self.key(signal_name, scope),
            CachedSignal {
                result: Arc::clone(&result),
                fetched_at: self.clock.now(),
            },
        );
        result
    }

    /// Return a fresh cached result or run `fetch` exactly once to fill it.
    ///
    /// Concurrent callers for the same key are coalesced: one runs `fetch`,
    /// the rest wait and receive its result. The flag is `true` on a hit.
    pub fn get_or_fetch<F>(
        &self,
        signal_name: &str,
        scope: &EvalScope,
        freshness: Option<Duration>,
        fetch: F,
    ) -> (Arc<SignalResult>, bool)
    where
        F: FnOnce() -> SignalResult,
    {
        let window = freshness.unwrap_or(self.default_freshness);
        let entry = self.store.entry(self.key(signal_name, scope)).or_insert_with_if(
            || CachedSignal {
                result: Arc::new(fetch()),
                fetched_at: self.clock.now(),
            },
            |existing| self.is_stale(existing, window),
        );

        let hit = !entry.is_fresh();
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        (entry.into_value().result, hit)
    }

    /// Drop entries for one signal across all scopes, or everything.
    /// Returns how many entries were removed.
    pub fn invalidate(&self, signal_name: Option<&str>) -> usize {
        match signal_name {
            None => {
                let count = self.store.iter().count();
                self.store.invalidate_all();
                self.store.run_pending_tasks();
                count
            }
            Some(name) => {
                let keys: Vec<Arc<String>> = self
                    .store
                    .iter()
                    .map(|(key, _)| key)
                    .filter(|key| self.signal_of_key(key) == Some(name))
                    .collect();
                for key in &keys {
                    self.store.invalidate(key.as_str());
                }
                keys.len()
            }
        }
    }

    pub fn len(&self) -> u64 {
        self.store.run_pending_tasks();
        self.store.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = (hits + misses).max(1) as f64;
        CacheStats {
            entries: self.len(),
            hits,
            misses,
            hit_rate: (hits as f64 / lookups * 1000.0).round() / 10.0,
        }
    }

    fn is_stale(&self, entry: &CachedSignal, window: Duration) -> bool {
        self.clock.now().saturating_duration_since(entry.fetched_at) > window
    }
}

impl std::fmt::Debug for SignalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalCache")
            .field("schema_version", &self.schema_version)
            .field("default_freshness", &self.default_freshness)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posture_core::traits::ManualClock;
    use std::sync::atomic::AtomicUsize;

    fn cache_with(clock: &ManualClock) -> SignalCache {
        SignalCache::with_clock(&SignalConfig::default(), Arc::new(clock.clone()))
    }

    fn scope() -> EvalScope {
        EvalScope::tenant("t1").with_subscriptions(["sub-a"])
    }

    #[test]
    fn key_includes_signal_scope_and_version() {
        let cache = SignalCache::new(&SignalConfig::default());
        let key = cache.key("arm:mg_hierarchy", &scope());
        assert!(key.starts_with("arm:mg_hierarchy:"));
        assert!(key.ends_with(":v1"));
    }

    #[test]
    fn fetches_once_within_window_and_again_after_expiry() {
        let clock = ManualClock::new();
        let cache = cache_with(&clock);
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            SignalResult::ok(vec![])
        };

        let (_, hit) = cache.get_or_fetch("policy:assignments", &scope(), None, fetch);
        assert!(!hit);
        clock.advance(Duration::from_secs(900));
        let (_, hit) = cache.get_or_fetch("policy:assignments", &scope(), None, fetch);
        assert!(hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(1));
        let (_, hit) = cache.get_or_fetch("policy:assignments", &scope(), None, fetch);
        assert!(!hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn per_call_freshness_overrides_default() {
        let clock = ManualClock::new();
        let cache = cache_with(&clock);
        cache.put("defender:pricings", &scope(), SignalResult::ok(vec![]));
        clock.advance(Duration::from_secs(30));
        assert!(cache
            .get("defender:pricings", &scope(), Some(Duration::from_secs(10)))
            .is_none());
        cache.put("defender:pricings", &scope(), SignalResult::ok(vec![]));
        assert!(cache.get("defender:pricings", &scope(), None).is_some());
    }

    #[test]
    fn invalidate_by_signal_keeps_others() {
        let cache = SignalCache::new(&SignalConfig::default());
        let other_scope = EvalScope::tenant("t2");
        cache.put("arm:mg_hierarchy", &scope(), SignalResult::ok(vec![]));
        cache.put("arm:mg_hierarchy", &other_scope, SignalResult::ok(vec![]));
        cache.put("policy:assignments", &scope(), SignalResult::ok(vec![]));

        assert_eq!(cache.invalidate(Some("arm:mg_hierarchy")), 2);
        assert!(cache.get("arm:mg_hierarchy", &scope(), None).is_none());
        assert!(cache.get("policy:assignments", &scope(), None).is_some());
        assert_eq!(cache.invalidate(None), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_matches_the_whole_signal_name() {
        let cache = SignalCache::new(&SignalConfig::default());
        cache.put("arm", &scope(), SignalResult::ok(vec![]));
        cache.put("arm:mg_hierarchy", &scope(), SignalResult::ok(vec![]));
        cache.put("arm:mg_hierarchy:children", &scope(), SignalResult::ok(vec![]));

        assert_eq!(cache.invalidate(Some("arm")), 1);
        assert!(cache.get("arm:mg_hierarchy", &scope(), None).is_some());
        assert_eq!(cache.invalidate(Some("arm:mg_hierarchy")), 1);
        assert!(cache.get("arm:mg_hierarchy:children", &scope(), None).is_some());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = SignalCache::new(&SignalConfig::default());
        assert!(cache.get("arm:mg_hierarchy", &scope(), None).is_none());
        cache.put("arm:mg_hierarchy", &scope(), SignalResult::ok(vec![]));
        assert!(cache.get("arm:mg_hierarchy", &scope(), None).is_some());
        assert!(cache.get("arm:mg_hierarchy", &scope(), None).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate, 66.7);
    }
}
