//! Signal layer: providers, the memoising bus, and the scope-keyed cache.

pub mod availability;
pub mod bus;
pub mod cache;
pub mod provider;
pub mod types;

pub use availability::{
    default_signal_sources, probe_signal_availability, Availability, AvailabilityEntry,
    AvailabilityMatrix,
};
pub use bus::SignalBus;
pub use cache::{CacheStats, SignalCache};
pub use provider::{RequiresSubscriptions, SignalProvider};
pub use types::{EvalScope, SignalMap, SignalResult, SignalStatus};
