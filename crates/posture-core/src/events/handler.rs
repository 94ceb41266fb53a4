//! PostureEventHandler trait: every method has a no-op default.

use super::types::*;

/// Observer for assessment lifecycle events.
///
/// Implementors override only the hooks they need. Handlers run
/// synchronously on the emitting thread and must be `Send + Sync`
/// because parallel evaluation emits from rayon workers.
pub trait PostureEventHandler: Send + Sync {
    fn on_signal_requested(&self, _event: &SignalRequestedEvent) {}

    fn on_signal_returned(&self, _event: &SignalReturnedEvent) {}

    fn on_control_evaluated(&self, _event: &ControlEvaluatedEvent) {}

    fn on_control_deferred(&self, _event: &ControlDeferredEvent) {}

    fn on_intent_completed(&self, _event: &IntentCompletedEvent) {}

    fn on_guardrail_violation(&self, _event: &GuardrailViolationEvent) {}
}
