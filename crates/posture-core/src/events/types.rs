//! Event payload types.

/// Payload for `on_signal_requested`. Emitted only on a cache miss,
/// right before the provider is called.
#[derive(Debug, Clone)]
pub struct SignalRequestedEvent {
    pub signal: String,
    pub scope_hash: String,
}

/// Payload for `on_signal_returned`.
#[derive(Debug, Clone)]
pub struct SignalReturnedEvent {
    pub signal: String,
    pub status: &'static str,
    pub cache_hit: bool,
    pub duration_ms: u64,
}

/// Payload for `on_control_evaluated`.
#[derive(Debug, Clone)]
pub struct ControlEvaluatedEvent {
    pub control_id: String,
    pub full_id: String,
    pub status: &'static str,
    pub duration_ms: u64,
}

/// Payload for `on_control_deferred`.
#[derive(Debug, Clone)]
pub struct ControlDeferredEvent {
    pub control_id: String,
    pub failed_parent: String,
    pub reason: String,
}

/// Payload for `on_intent_completed`.
#[derive(Debug, Clone)]
pub struct IntentCompletedEvent {
    pub intent: String,
    pub status: &'static str,
    pub evaluated: usize,
    pub passed: usize,
    pub failed: usize,
    pub deferred: usize,
    pub duration_ms: u64,
}

/// Payload for `on_guardrail_violation`.
#[derive(Debug, Clone)]
pub struct GuardrailViolationEvent {
    pub gate: &'static str,
    pub violation: String,
}
