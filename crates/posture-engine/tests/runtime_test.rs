//! Assessment runtime over the fixture pack: ordering, deferral, isolation,
//! parallel equivalence.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::CallCounter;
use posture_core::config::{PostureConfig, RuntimeConfig, SignalConfig};
use posture_core::errors::{CatalogError, EvaluatorError, GraphError, PostureErrorCode, RuntimeError};
use posture_core::events::{ControlDeferredEvent, EventDispatcher, IntentCompletedEvent, PostureEventHandler};
use posture_engine::runtime::{
    require_payload, AssessmentRuntime, Confidence, ControlResult, EvalContext, EvaluatorRegistry, IntentStatus,
    RunPhase,
};
use posture_engine::signals::SignalMap;
use posture_engine::taxonomy::ControlStatus;
use posture_engine::ControlPack;

fn runtime(pack: &ControlPack, verdicts: &[(&str, ControlStatus)], parallel: bool) -> AssessmentRuntime {
    AssessmentRuntime::new(
        Arc::new(common::healthy_bus()),
        Arc::clone(pack.graph()),
        common::evaluators(pack, verdicts),
    )
    .with_config(RuntimeConfig {
        parallel: Some(parallel),
        ..RuntimeConfig::default()
    })
}

#[derive(Default)]
struct Recorder {
    deferred: AtomicUsize,
    completed: AtomicUsize,
}

impl PostureEventHandler for Recorder {
    fn on_control_deferred(&self, _event: &ControlDeferredEvent) {
        self.deferred.fetch_add(1, Ordering::SeqCst);
    }

    fn on_intent_completed(&self, _event: &IntentCompletedEvent) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_all_pass_is_ready() {
    let pack = common::load_pack();
    let run = runtime(&pack, &[], false)
        .execute_intent("core_governance", &common::scope())
        .unwrap();
    assert_eq!(run.intent.status, IntentStatus::Ready);
    assert_eq!(run.intent.controls_evaluated, 6);
    assert_eq!(run.intent.summary, "All 6 controls passed for core_governance.");
    assert_eq!(run.intent.data_confidence, Confidence::High);
    assert!(run.questions.is_empty());
    assert_eq!(
        run.phases,
        [RunPhase::Planned, RunPhase::Evaluating, RunPhase::Questions, RunPhase::Done]
    );
    assert_eq!(run.coverage.automation_percent, 100.0);
}

#[test]
fn test_failed_parent_defers_opted_in_child() {
    let pack = common::load_pack();
    let recorder = Arc::new(Recorder::default());
    let mut events = EventDispatcher::new();
    events.register(recorder.clone());

    let run = runtime(&pack, &[("2df27ee4", ControlStatus::Fail)], false)
        .with_events(events)
        .execute_intent("core_governance", &common::scope())
        .unwrap();

    assert_eq!(run.results["61623a76"].status, ControlStatus::Deferred);
    assert_eq!(run.results["61623a76"].reason, "Deferred: parent 2df27ee4 failed");
    // A deferred parent does not itself block its children.
    assert_eq!(run.results["92481607"].status, ControlStatus::Pass);

    assert_eq!(run.intent.status, IntentStatus::NotReady);
    assert_eq!(run.intent.failed_controls, ["2df27ee4"]);
    assert_eq!(run.intent.deferred_controls, ["61623a76"]);
    assert_eq!(
        run.intent.passed_controls,
        ["3829e7e3", "5c986cb2", "d8a2adb1", "92481607"]
    );
    assert_eq!(
        run.intent.summary,
        "1/6 control(s) failed for core_governance. 1 deferred, 4 passed."
    );
    // The deferred child's weight counts against governance: 1.4 / 3.2.
    assert_eq!(run.intent.discipline_scores["governance"].score, 44);

    let question_ids: Vec<&str> = run.questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(question_ids, ["Q-MG-01"]);

    assert_eq!(recorder.deferred.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_signal_failure_becomes_signal_error_and_blocks_children() {
    let pack = common::load_pack();
    let counter = Arc::new(CallCounter::default());
    let bus = common::bus_with(&["policy:assignments"], Arc::clone(&counter));
    let runtime = AssessmentRuntime::new(Arc::new(bus), Arc::clone(pack.graph()), common::evaluators(&pack, &[]));

    let run = runtime.execute_intent("core_governance", &common::scope()).unwrap();
    let parent = &run.results["3829e7e3"];
    assert_eq!(parent.status, ControlStatus::SignalError);
    assert!(parent.reason.starts_with("Signal policy:assignments failed"));
    assert_eq!(parent.confidence, Confidence::Low);

    assert_eq!(run.results["5c986cb2"].status, ControlStatus::Deferred);
    // No defer opt-in: evaluated, and the same failing signal surfaces.
    assert_eq!(run.results["d8a2adb1"].status, ControlStatus::SignalError);

    assert_eq!(run.intent.status, IntentStatus::Partial);
    assert_eq!(run.intent.data_confidence, Confidence::Low);
    assert_eq!(run.coverage.signal_error_controls, 2);
    // Errors are cached like any other result: one provider call.
    assert_eq!(counter.calls("policy:assignments"), 1);
}

#[test]
fn test_panicking_evaluator_is_isolated() {
    let pack = common::load_pack();
    let mut registry = common::evaluators(&pack, &[]);
    registry.register(
        "e6c4cfd3-e504-4547-a244-7ec66138a720",
        |_: &EvalContext, _: &SignalMap| -> Result<ControlResult, EvaluatorError> {
            panic!("firewall payload had an unexpected shape")
        },
    );
    let runtime = AssessmentRuntime::new(Arc::new(common::healthy_bus()), Arc::clone(pack.graph()), registry);

    let run = runtime
        .execute_intent("enterprise_scale_readiness", &common::scope())
        .unwrap();
    let firewall = &run.results["e6c4cfd3"];
    assert_eq!(firewall.status, ControlStatus::EvaluationError);
    assert!(firewall.reason.contains("unexpected shape"));
    assert_eq!(run.results["f1a9c2b7"].status, ControlStatus::Pass);
    assert_eq!(run.results["0b7d6e21"].status, ControlStatus::Manual);
    assert_eq!(run.results.len(), 8);
}

#[test]
fn test_evaluator_reads_payload_from_bus() {
    let pack = common::load_pack();
    let mut registry = common::evaluators(&pack, &[]);
    registry.register(
        "f1a9c2b7-7c0e-4d6b-9a55-31e8d2c4b6a0",
        |_: &EvalContext, signals: &SignalMap| -> Result<ControlResult, EvaluatorError> {
            let payload = require_payload(signals, "defender:pricings")?;
            if payload["subscriptions"] == 2 {
                Ok(ControlResult::pass("Defender enabled on every subscription"))
            } else {
                Ok(ControlResult::fail("Defender missing on some subscriptions"))
            }
        },
    );
    let runtime = AssessmentRuntime::new(Arc::new(common::healthy_bus()), Arc::clone(pack.graph()), registry);
    let result = runtime.evaluate_control("f1a9c2b7", &common::scope(), "run-manual");
    assert_eq!(result.status, ControlStatus::Pass);
    assert_eq!(result.control_id, "f1a9c2b7");
    assert_eq!(result.signals_used, ["defender:pricings"]);
}

#[test]
fn test_unknown_control_and_missing_evaluator() {
    let pack = common::load_pack();
    let registry = EvaluatorRegistry::new();
    let runtime = AssessmentRuntime::new(Arc::new(common::healthy_bus()), Arc::clone(pack.graph()), registry);
    let scope = common::scope();

    let unknown = runtime.evaluate_control("ffffffff", &scope, "r");
    assert_eq!(unknown.status, ControlStatus::EvaluationError);

    let unregistered = runtime.evaluate_control("d8a2adb1", &scope, "r");
    assert_eq!(unregistered.status, ControlStatus::EvaluationError);
    assert!(unregistered.reason.contains("d8a2adb1-0f39-4a65-bd27-0a3f7d9c5e11"));

    let manual = runtime.evaluate_control("0b7d6e21", &scope, "r");
    assert_eq!(manual.status, ControlStatus::Manual);
    assert_eq!(manual.reason, "Requires manual verification");
}

#[test]
fn test_parallel_matches_sequential() {
    let pack = common::load_pack();
    let verdicts = [
        ("2df27ee4", ControlStatus::Fail),
        ("3829e7e3", ControlStatus::Partial),
        ("e6c4cfd3", ControlStatus::Fail),
    ];
    let scope = common::scope();
    let sequential = runtime(&pack, &verdicts, false)
        .execute_intent("enterprise_scale_readiness", &scope)
        .unwrap();
    let parallel = runtime(&pack, &verdicts, true)
        .execute_intent("enterprise_scale_readiness", &scope)
        .unwrap();

    assert_eq!(sequential.results, parallel.results);
    assert_eq!(sequential.intent, parallel.intent);
    assert_eq!(sequential.deferrals, parallel.deferrals);
    assert_eq!(sequential.questions, parallel.questions);
    assert!(parallel.phases.contains(&RunPhase::Preflight));
}

#[test]
fn test_preflight_fetches_each_signal_once() {
    let pack = common::load_pack();
    let counter = Arc::new(CallCounter::default());
    let bus = common::bus_with(&[], Arc::clone(&counter));
    let runtime = AssessmentRuntime::new(Arc::new(bus), Arc::clone(pack.graph()), common::evaluators(&pack, &[]))
        .with_config(RuntimeConfig {
            preflight: Some(true),
            ..RuntimeConfig::default()
        });

    runtime.execute_intent("core_governance", &common::scope()).unwrap();
    assert_eq!(counter.calls("arm:mg_hierarchy"), 1);
    assert_eq!(counter.calls("policy:assignments"), 1);
    assert_eq!(counter.calls("policy:compliance_summary"), 1);
    assert_eq!(counter.total(), 3);
}

#[test]
fn test_run_ids_are_unique_per_run() {
    let pack = common::load_pack();
    let runtime = runtime(&pack, &[], false);
    let scope = common::scope();
    let first = runtime.execute_intent("network_baseline", &scope).unwrap();
    let second = runtime.execute_intent("network_baseline", &scope).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert!(first.run_id.starts_with(&format!("run-{}-", scope.scope_hash())));
}

#[test]
fn test_unknown_intent_surfaces_as_runtime_error() {
    let pack = common::load_pack();
    let err = runtime(&pack, &[], false)
        .execute_intent("does_not_exist", &common::scope())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Graph(GraphError::UnknownIntent { .. })));
    assert_eq!(err.error_code(), "UNKNOWN_INTENT");
}

#[test]
fn test_unknown_control_is_an_evaluation_error_result() {
    let pack = common::load_pack();
    let result = runtime(&pack, &[], false).evaluate_control("deadbeef", &common::scope(), "run-x");
    assert_eq!(result.status, ControlStatus::EvaluationError);
    assert_eq!(result.control_id, "deadbeef");
    assert_eq!(result.reason, "Unknown control: 'deadbeef'");
}

#[test]
fn test_load_wires_config_and_pack() {
    let config = PostureConfig {
        runtime: RuntimeConfig {
            parallel: Some(true),
            ..RuntimeConfig::default()
        },
        ..PostureConfig::default()
    };
    let pack = common::load_pack();
    let runtime = AssessmentRuntime::load(
        common::fixture_dir(),
        &config,
        common::healthy_bus(),
        common::evaluators(&pack, &[]),
    )
    .unwrap();
    assert_eq!(runtime.graph().summary().total_controls, 9);
    let run = runtime.execute_intent("core_governance", &common::scope()).unwrap();
    assert_eq!(run.intent.status, IntentStatus::Ready);
}

#[test]
fn test_load_rejects_invalid_config_before_touching_the_pack() {
    let config = PostureConfig {
        signals: SignalConfig {
            freshness_seconds: Some(0),
            ..SignalConfig::default()
        },
        ..PostureConfig::default()
    };
    let err = AssessmentRuntime::load(
        "/nonexistent/pack",
        &config,
        common::healthy_bus(),
        EvaluatorRegistry::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RuntimeError::Config(_)));
}

#[test]
fn test_load_reports_missing_pack() {
    let err = AssessmentRuntime::load(
        "/nonexistent/pack",
        &PostureConfig::default(),
        common::healthy_bus(),
        EvaluatorRegistry::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RuntimeError::Catalog(CatalogError::PackNotFound { .. })));
    assert_eq!(err.error_code(), "CATALOG_ERROR");
}
