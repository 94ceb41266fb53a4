//! Configuration system for Posture.
//! TOML-based, 4-layer resolution: CLI > env > project > user > defaults.

pub mod graph_config;
pub mod guardrail_config;
pub mod posture_config;
pub mod runtime_config;
pub mod signal_config;

pub use graph_config::GraphConfig;
pub use guardrail_config::{CostMode, GuardrailConfig};
pub use posture_config::{CliOverrides, PostureConfig};
pub use runtime_config::RuntimeConfig;
pub use signal_config::SignalConfig;
