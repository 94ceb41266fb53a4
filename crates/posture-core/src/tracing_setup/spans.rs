//! Span definitions per operation: planning, intent execution, signal fetch, guardrails.

/// Create a planning span.
#[macro_export]
macro_rules! plan_span {
    ($intent:expr) => {
        tracing::info_span!("posture.plan", intent = %$intent)
    };
}

/// Create an intent execution span.
#[macro_export]
macro_rules! execute_intent_span {
    ($intent:expr, $run_id:expr) => {
        tracing::info_span!("posture.execute_intent", intent = %$intent, run_id = %$run_id)
    };
}

/// Create a signal fetch span.
#[macro_export]
macro_rules! signal_fetch_span {
    ($signal:expr) => {
        tracing::debug_span!("posture.signal_fetch", signal = %$signal)
    };
}

/// Create a guardrail validation span.
#[macro_export]
macro_rules! guardrails_span {
    ($gate:expr) => {
        tracing::info_span!("posture.guardrails", gate = %$gate)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const PLAN: &str = "posture.plan";
    pub const EXECUTE_INTENT: &str = "posture.execute_intent";
    pub const SIGNAL_FETCH: &str = "posture.signal_fetch";
    pub const GUARDRAILS: &str = "posture.guardrails";
}
