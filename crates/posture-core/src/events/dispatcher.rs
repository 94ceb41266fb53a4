//! EventDispatcher: synchronous fan-out to registered handlers.

use std::sync::Arc;

use super::handler::PostureEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// With no handlers registered every `emit_*` is an empty loop.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn PostureEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn PostureEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit an event to all registered handlers.
    /// A panicking handler is logged and does not starve the ones after it.
    fn emit<F: Fn(&dyn PostureEventHandler)>(&self, f: F) {
        for (index, handler) in self.handlers.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::warn!(handler = index, "event handler panicked");
            }
        }
    }

    // ---- Signals ----
    pub fn emit_signal_requested(&self, event: &SignalRequestedEvent) {
        self.emit(|h| h.on_signal_requested(event));
    }

    pub fn emit_signal_returned(&self, event: &SignalReturnedEvent) {
        self.emit(|h| h.on_signal_returned(event));
    }

    // ---- Controls ----
    pub fn emit_control_evaluated(&self, event: &ControlEvaluatedEvent) {
        self.emit(|h| h.on_control_evaluated(event));
    }

    pub fn emit_control_deferred(&self, event: &ControlDeferredEvent) {
        self.emit(|h| h.on_control_deferred(event));
    }

    // ---- Intents ----
    pub fn emit_intent_completed(&self, event: &IntentCompletedEvent) {
        self.emit(|h| h.on_intent_completed(event));
    }

    // ---- Guardrails ----
    pub fn emit_guardrail_violation(&self, event: &GuardrailViolationEvent) {
        self.emit(|h| h.on_guardrail_violation(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
