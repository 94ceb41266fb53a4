//! SignalBus: name-to-provider dispatch with scope-keyed memoisation.
//!
//! Evaluators never call providers directly. They name the signals they
//! need and the bus fetches each distinct (signal, scope) at most once per
//! freshness window, however many controls ask for it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use posture_core::config::SignalConfig;
use posture_core::errors::SignalError;
use posture_core::events::{EventDispatcher, SignalRequestedEvent, SignalReturnedEvent};
use posture_core::types::collections::FxHashMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::cache::SignalCache;
use super::provider::SignalProvider;
use super::types::{EvalScope, SignalMap, SignalResult};

/// Memoised signal dispatcher. Build once, then share behind `Arc`.
pub struct SignalBus {
    providers: FxHashMap<String, Arc<dyn SignalProvider>>,
    cache: SignalCache,
    events: EventDispatcher,
}

impl SignalBus {
    pub fn new(cache: SignalCache) -> Self {
        Self {
            providers: FxHashMap::default(),
            cache,
            events: EventDispatcher::new(),
        }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(SignalCache::new(config))
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Register `provider` under `name`, replacing any earlier registration.
    pub fn register<P>(&mut self, name: impl Into<String>, provider: P)
    where
        P: SignalProvider + 'static,
    {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    pub fn register_shared(&mut self, name: impl Into<String>, provider: Arc<dyn SignalProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered signal names, sorted.
    pub fn registered_signals(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn cache(&self) -> &SignalCache {
        &self.cache
    }

    pub fn fetch(&self, name: &str, scope: &EvalScope) -> Arc<SignalResult> {
        self.fetch_with_freshness(name, scope, None)
    }

    /// Fetch a signal, serving it from cache when younger than `freshness`
    /// (default: the configured window).
    ///
    /// An unregistered name yields an `Error` result that is not cached.
    pub fn fetch_with_freshness(
        &self,
        name: &str,
        scope: &EvalScope,
        freshness: Option<Duration>,
    ) -> Arc<SignalResult> {
        let _span = posture_core::signal_fetch_span!(name).entered();

        let Some(provider) = self.providers.get(name) else {
            warn!(signal = name, "unknown signal requested");
            let result = SignalResult {
                signal_name: name.to_string(),
                ..SignalResult::error(SignalError::UnknownSignal(name.to_string()).to_string())
            };
            self.emit_returned(&result, false);
            return Arc::new(result);
        };

        let (result, hit) = self.cache.get_or_fetch(name, scope, freshness, || {
            self.call_provider(name, provider.as_ref(), scope)
        });
        self.emit_returned(&result, hit);
        result
    }

    /// Fetch several signals sequentially. Duplicates collapse to one entry.
    pub fn fetch_many<S: AsRef<str>>(&self, names: &[S], scope: &EvalScope) -> SignalMap {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), self.fetch(name, scope))
            })
            .collect()
    }

    /// Fetch several signals concurrently on the rayon pool.
    ///
    /// Same-key requests are coalesced by the cache, so the provider call
    /// count matches the sequential path.
    pub fn prefetch<S: AsRef<str> + Sync>(&self, names: &[S], scope: &EvalScope) -> SignalMap {
        names
            .par_iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), self.fetch(name, scope))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }

    fn call_provider(&self, name: &str, provider: &dyn SignalProvider, scope: &EvalScope) -> SignalResult {
        self.events.emit_signal_requested(&SignalRequestedEvent {
            signal: name.to_string(),
            scope_hash: scope.scope_hash(),
        });

        let started = Instant::now();
        let mut result = match provider.fetch(scope) {
            Ok(result) => result,
            Err(e) => {
                warn!(signal = name, error = %e, "signal provider failed");
                SignalResult::error(e.to_string())
            }
        };
        result.signal_name = name.to_string();
        if result.duration_ms == 0 {
            result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        }
        debug!(
            signal = name,
            status = result.status.name(),
            duration_ms = result.duration_ms,
            "signal fetched"
        );
        result
    }

    fn emit_returned(&self, result: &SignalResult, cache_hit: bool) {
        self.events.emit_signal_returned(&SignalReturnedEvent {
            signal: result.signal_name.clone(),
            status: result.status.name(),
            cache_hit,
            duration_ms: if cache_hit { 0 } else { result.duration_ms },
        });
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("providers", &self.registered_signals())
            .field("cache", &self.cache)
            .finish()
    }
}
