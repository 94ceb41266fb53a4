//! Tests for the event dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use posture_core::events::*;

#[derive(Default)]
struct CountingHandler {
    returned: AtomicUsize,
    cache_hits: AtomicUsize,
    deferred: AtomicUsize,
}

impl PostureEventHandler for CountingHandler {
    fn on_signal_returned(&self, event: &SignalReturnedEvent) {
        self.returned.fetch_add(1, Ordering::SeqCst);
        if event.cache_hit {
            self.cache_hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_control_deferred(&self, _event: &ControlDeferredEvent) {
        self.deferred.fetch_add(1, Ordering::SeqCst);
    }
}

struct PanickingHandler;

impl PostureEventHandler for PanickingHandler {
    fn on_signal_returned(&self, _event: &SignalReturnedEvent) {
        panic!("handler bug");
    }
}

fn returned(cache_hit: bool) -> SignalReturnedEvent {
    SignalReturnedEvent {
        signal: "arm:mg_hierarchy".to_string(),
        status: "OK",
        cache_hit,
        duration_ms: 3,
    }
}

#[test]
fn empty_dispatcher_is_a_noop() {
    let dispatcher = EventDispatcher::new();
    assert_eq!(dispatcher.handler_count(), 0);
    dispatcher.emit_signal_returned(&returned(false));
}

#[test]
fn handlers_receive_events() {
    let handler = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(handler.clone());

    dispatcher.emit_signal_returned(&returned(false));
    dispatcher.emit_signal_returned(&returned(true));
    dispatcher.emit_control_deferred(&ControlDeferredEvent {
        control_id: "b2".to_string(),
        failed_parent: "a1".to_string(),
        reason: "Deferred: parent a1 failed".to_string(),
    });

    assert_eq!(handler.returned.load(Ordering::SeqCst), 2);
    assert_eq!(handler.cache_hits.load(Ordering::SeqCst), 1);
    assert_eq!(handler.deferred.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_handler_does_not_block_others() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(PanickingHandler));
    dispatcher.register(counter.clone());

    dispatcher.emit_signal_returned(&returned(false));
    assert_eq!(counter.returned.load(Ordering::SeqCst), 1);
}

#[test]
fn unhandled_hooks_default_to_noop() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(counter.clone());

    dispatcher.emit_intent_completed(&IntentCompletedEvent {
        intent: "core_governance".to_string(),
        status: "Ready",
        evaluated: 3,
        passed: 3,
        failed: 0,
        deferred: 0,
        duration_ms: 1,
    });
    dispatcher.emit_guardrail_violation(&GuardrailViolationEvent {
        gate: "relationship_integrity",
        violation: "ROADMAP_REF".to_string(),
    });
    assert_eq!(counter.returned.load(Ordering::SeqCst), 0);
}
