//! Stable, machine-readable error codes.

/// Every subsystem error exposes a stable code for reports and logs.
pub trait PostureErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const TAXONOMY_VIOLATION: &str = "TAXONOMY_VIOLATION";
pub const CATALOG_ERROR: &str = "CATALOG_ERROR";
pub const CATALOG_VERSION_LOCKED: &str = "CATALOG_VERSION_LOCKED";
pub const UNKNOWN_INTENT: &str = "UNKNOWN_INTENT";
pub const GRAPH_CYCLE: &str = "GRAPH_CYCLE";
pub const GRAPH_ERROR: &str = "GRAPH_ERROR";
pub const SIGNAL_ERROR: &str = "SIGNAL_ERROR";
pub const EVALUATION_ERROR: &str = "EVALUATION_ERROR";
pub const INTEGRITY_VIOLATION: &str = "INTEGRITY_VIOLATION";
pub const EVIDENCE_VIOLATION: &str = "EVIDENCE_VIOLATION";
pub const UNKNOWN_CONTROL: &str = "UNKNOWN_CONTROL";
