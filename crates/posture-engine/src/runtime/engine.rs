//! AssessmentRuntime: drives an evaluation plan against the signal bus and
//! the evaluator registry.
//!
//! Nothing in here makes a judgement call. Verdicts come from evaluators,
//! ordering and deferral from the graph, data from the bus.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use posture_core::config::{PostureConfig, RuntimeConfig};
use posture_core::errors::{EvaluatorError, GraphError, RuntimeError};
use posture_core::events::{ControlDeferredEvent, ControlEvaluatedEvent, EventDispatcher, IntentCompletedEvent};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::coverage::automation_coverage;
use super::evaluator::EvaluatorRegistry;
use super::types::{
    AssessmentRun, Confidence, ControlResult, EvalContext, IntentResult, IntentStatus, RunPhase,
};
use crate::catalog::ControlPack;
use crate::graph::{ControlGraph, Deferral, EvaluationPlan};
use crate::signals::{EvalScope, SignalBus, SignalStatus};
use crate::taxonomy::{ControlStatus, EvaluationMode};

pub struct AssessmentRuntime {
    bus: Arc<SignalBus>,
    graph: Arc<ControlGraph>,
    evaluators: Arc<EvaluatorRegistry>,
    config: RuntimeConfig,
    events: EventDispatcher,
    run_seq: AtomicU64,
}

impl AssessmentRuntime {
    pub fn new(bus: Arc<SignalBus>, graph: Arc<ControlGraph>, evaluators: EvaluatorRegistry) -> Self {
        Self {
            bus,
            graph,
            evaluators: Arc::new(evaluators),
            config: RuntimeConfig::default(),
            events: EventDispatcher::new(),
            run_seq: AtomicU64::new(0),
        }
    }

    /// Validate `config`, load the pack at `dir` with its graph settings,
    /// and wire the result to `bus` and `evaluators`.
    pub fn load(
        dir: impl AsRef<Path>,
        config: &PostureConfig,
        bus: SignalBus,
        evaluators: EvaluatorRegistry,
    ) -> Result<Self, RuntimeError> {
        PostureConfig::validate(config)?;
        let pack = ControlPack::load_with(dir, &config.graph)?;
        info!(pack = %pack.version_tag(), controls = pack.control_count(), "runtime loaded");
        Ok(Self::new(Arc::new(bus), Arc::clone(pack.graph()), evaluators).with_config(config.runtime.clone()))
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn graph(&self) -> &ControlGraph {
        &self.graph
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn evaluators(&self) -> &EvaluatorRegistry {
        &self.evaluators
    }

    /// Evaluate one control by short or long-form id.
    ///
    /// Never fails: unknown controls, signal errors, evaluator errors, and
    /// evaluator panics all come back as results with an error status.
    pub fn evaluate_control(&self, id: &str, scope: &EvalScope, run_id: &str) -> ControlResult {
        let started = Instant::now();
        let result = self.evaluate_isolated(id, scope, run_id);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            control = result.control_id.as_str(),
            status = result.status.name(),
            duration_ms,
            "control evaluated"
        );
        self.events.emit_control_evaluated(&ControlEvaluatedEvent {
            control_id: result.control_id.clone(),
            full_id: self
                .graph
                .resolve_full_id(&result.control_id)
                .unwrap_or_default()
                .to_string(),
            status: result.status.name(),
            duration_ms,
        });
        result
    }

    /// Evaluate every control that has a registered evaluator, in long-form
    /// id order.
    pub fn evaluate_all(&self, scope: &EvalScope, run_id: &str) -> Vec<ControlResult> {
        self.evaluators
            .ids()
            .into_iter()
            .map(|full_id| self.evaluate_control(full_id, scope, run_id))
            .collect()
    }

    /// Plan and run a named intent bundle.
    pub fn execute_intent(&self, intent: &str, scope: &EvalScope) -> Result<AssessmentRun, RuntimeError> {
        let plan = self.graph.plan_evaluation(intent)?;
        Ok(self.execute_plan(plan, scope))
    }

    /// Run an already-built plan to completion.
    pub fn execute_plan(&self, plan: EvaluationPlan, scope: &EvalScope) -> AssessmentRun {
        let run_id = self.next_run_id(scope);
        let _span = posture_core::execute_intent_span!(plan.intent(), run_id).entered();
        let started = Instant::now();

        let mut state = RunState::default();
        state.phases.push(RunPhase::Planned);

        if self.config.effective_preflight() {
            state.phases.push(RunPhase::Preflight);
            let fetched = self.bus.prefetch(plan.required_signals(), scope);
            let failed = fetched
                .values()
                .filter(|s| s.status == SignalStatus::Error)
                .count();
            debug!(signals = fetched.len(), failed, "preflight complete");
        }

        state.phases.push(RunPhase::Evaluating);
        if self.config.effective_parallel() {
            self.run_waves(&plan, scope, &run_id, &mut state);
        } else {
            self.run_sequential(&plan, scope, &run_id, &mut state);
        }

        let mut questions = Vec::new();
        if self.config.effective_collect_questions() {
            state.phases.push(RunPhase::Questions);
            let needs_input: BTreeSet<String> = state
                .results
                .iter()
                .filter(|(_, r)| r.status.is_risk())
                .map(|(id, _)| id.clone())
                .collect();
            if !needs_input.is_empty() {
                questions = self
                    .graph
                    .get_questions_for(plan.ordered_controls(), Some(&needs_input));
            }
        }

        let intent = self.aggregate(&plan, &state.results);
        let coverage = automation_coverage(&state.results, state.results.len());
        state.phases.push(RunPhase::Done);

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            intent = plan.intent(),
            status = intent.status.name(),
            evaluated = intent.controls_evaluated,
            passed = intent.passed_controls.len(),
            failed = intent.failed_controls.len(),
            deferred = intent.deferred_controls.len(),
            duration_ms,
            "intent executed"
        );
        self.events.emit_intent_completed(&IntentCompletedEvent {
            intent: intent.intent.clone(),
            status: intent.status.name(),
            evaluated: intent.controls_evaluated,
            passed: intent.passed_controls.len(),
            failed: intent.failed_controls.len(),
            deferred: intent.deferred_controls.len(),
            duration_ms,
        });

        AssessmentRun {
            run_id,
            plan,
            results: state.results,
            intent,
            deferrals: state.deferrals,
            questions,
            phases: state.phases,
            coverage,
        }
    }

    fn run_sequential(&self, plan: &EvaluationPlan, scope: &EvalScope, run_id: &str, state: &mut RunState) {
        for id in plan.ordered_controls() {
            let deferrals = self.graph.apply_deferrals(plan, &state.results);
            if let Some(deferral) = deferrals.into_iter().find(|d| &d.control_id == id) {
                self.record_deferral(deferral, state);
                continue;
            }
            let result = self.evaluate_control(id, scope, run_id);
            state.results.insert(id.clone(), result);
        }
    }

    /// Evaluate dependency waves, each wave's controls in parallel.
    ///
    /// Every in-plan parent of a control sits in an earlier wave, so the
    /// deferral check before each wave sees the same parent statuses the
    /// sequential loop would.
    fn run_waves(&self, plan: &EvaluationPlan, scope: &EvalScope, run_id: &str, state: &mut RunState) {
        for wave in self.graph.plan_waves(plan) {
            let mut deferred: BTreeMap<String, Deferral> = self
                .graph
                .apply_deferrals(plan, &state.results)
                .into_iter()
                .map(|d| (d.control_id.clone(), d))
                .collect();

            let mut runnable = Vec::with_capacity(wave.len());
            for id in wave {
                match deferred.remove(&id) {
                    Some(deferral) => self.record_deferral(deferral, state),
                    None => runnable.push(id),
                }
            }

            let evaluated: Vec<(String, ControlResult)> = runnable
                .into_par_iter()
                .map(|id| {
                    let result = self.evaluate_control(&id, scope, run_id);
                    (id, result)
                })
                .collect();
            state.results.extend(evaluated);
        }
    }

    fn record_deferral(&self, deferral: Deferral, state: &mut RunState) {
        info!(
            control = deferral.control_id.as_str(),
            parent = deferral.failed_parent.as_str(),
            "control deferred"
        );
        self.events.emit_control_deferred(&ControlDeferredEvent {
            control_id: deferral.control_id.clone(),
            failed_parent: deferral.failed_parent.clone(),
            reason: deferral.reason.clone(),
        });
        state.results.insert(
            deferral.control_id.clone(),
            ControlResult::deferred(deferral.control_id.clone(), deferral.reason.clone()),
        );
        state.deferrals.push(deferral);
    }

    fn evaluate_isolated(&self, id: &str, scope: &EvalScope, run_id: &str) -> ControlResult {
        let Some(node) = self.graph.resolve(id) else {
            warn!(control = id, "evaluation requested for unknown control");
            return ControlResult::evaluation_error(GraphError::UnknownControl(id.to_string()).to_string())
                .with_control_id(id);
        };
        let definition = node.definition();
        let short_id = definition.control_id();
        let full_id = definition.full_id();
        let required = definition.required_signals();

        let Some(evaluator) = self.evaluators.get(full_id) else {
            let result = if definition.evaluation_mode() == EvaluationMode::Manual {
                ControlResult::manual("Requires manual verification")
            } else {
                ControlResult::evaluation_error(EvaluatorError::NotRegistered(full_id.to_string()).to_string())
            };
            return result
                .with_control_id(short_id)
                .with_severity(definition.severity());
        };

        let signals = self.bus.fetch_many(required, scope);
        if let Some((name, failed)) = signals.iter().find(|(_, s)| s.status == SignalStatus::Error) {
            return ControlResult::signal_error(format!("Signal {name} failed: {}", failed.error_msg))
                .with_control_id(short_id)
                .with_severity(definition.severity())
                .with_signals_used(required.iter().cloned());
        }

        let ctx = EvalContext {
            scope: scope.clone(),
            run_id: run_id.to_string(),
            control_id: short_id.to_string(),
            full_id: full_id.to_string(),
            options: BTreeMap::new(),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(&ctx, &signals)));
        let mut result = match outcome {
            Ok(Ok(result)) if result.status == ControlStatus::Deferred => ControlResult::evaluation_error(
                "Evaluator returned Deferred, which only the runtime may assign",
            ),
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(control = short_id, error = %e, "evaluator failed");
                ControlResult::evaluation_error(e.to_string())
            }
            Err(payload) => {
                let e = EvaluatorError::Panicked(panic_message(payload.as_ref()));
                warn!(control = short_id, error = %e, "evaluator panicked");
                ControlResult::evaluation_error(e.to_string())
            }
        };

        result.control_id = short_id.to_string();
        result.severity = definition.severity();
        if result.signals_used.is_empty() {
            result.signals_used = required.to_vec();
        }
        result
    }

    fn aggregate(&self, plan: &EvaluationPlan, results: &BTreeMap<String, ControlResult>) -> IntentResult {
        let passed = ids_with_status(plan, results, ControlStatus::Pass);
        let failed = ids_with_status(plan, results, ControlStatus::Fail);
        let deferred = ids_with_status(plan, results, ControlStatus::Deferred);

        let status = if failed.is_empty() && deferred.is_empty() {
            IntentStatus::Ready
        } else if !failed.is_empty() {
            IntentStatus::NotReady
        } else {
            IntentStatus::Partial
        };

        let summary = if failed.is_empty() {
            format!("All {} controls passed for {}.", passed.len(), plan.intent())
        } else {
            format!(
                "{}/{} control(s) failed for {}. {} deferred, {} passed.",
                failed.len(),
                results.len(),
                plan.intent(),
                deferred.len(),
                passed.len()
            )
        };

        IntentResult {
            intent: plan.intent().to_string(),
            status,
            summary,
            controls_evaluated: results.len(),
            passed_controls: passed,
            failed_controls: failed,
            deferred_controls: deferred,
            data_confidence: Confidence::aggregate(results.values().map(|r| r.confidence)),
            discipline_scores: self.graph.discipline_score(results),
        }
    }

    fn next_run_id(&self, scope: &EvalScope) -> String {
        let seq = self.run_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("run-{}-{seq}", scope.scope_hash())
    }
}

impl std::fmt::Debug for AssessmentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentRuntime")
            .field("controls", &self.graph.len())
            .field("evaluators", &self.evaluators.len())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Default)]
struct RunState {
    results: BTreeMap<String, ControlResult>,
    deferrals: Vec<Deferral>,
    phases: Vec<RunPhase>,
}

/// Ids in plan order whose result has `status`.
fn ids_with_status(
    plan: &EvaluationPlan,
    results: &BTreeMap<String, ControlResult>,
    status: ControlStatus,
) -> Vec<String> {
    plan.ordered_controls()
        .iter()
        .filter(|id| results.get(id.as_str()).is_some_and(|r| r.status == status))
        .cloned()
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
