//! Signal cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default freshness window for cached signals, in seconds.
pub const DEFAULT_FRESHNESS_SECONDS: u64 = 900;

/// Configuration for the signal cache and bus.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignalConfig {
    /// Freshness window for cached results. Default: 900.
    pub freshness_seconds: Option<u64>,
    /// Maximum cached entries. Default: 10_000.
    pub max_entries: Option<u64>,
    /// Query schema tag folded into every cache key. Default: "v1".
    pub schema_version: Option<String>,
}

impl SignalConfig {
    pub fn effective_freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_seconds.unwrap_or(DEFAULT_FRESHNESS_SECONDS))
    }

    pub fn effective_max_entries(&self) -> u64 {
        self.max_entries.unwrap_or(10_000)
    }

    pub fn effective_schema_version(&self) -> &str {
        self.schema_version.as_deref().unwrap_or("v1")
    }
}
