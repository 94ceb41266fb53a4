//! Assessment runtime: evaluator registry, plan execution, aggregation.

pub mod coverage;
pub mod engine;
pub mod evaluator;
pub mod types;

pub use coverage::{automation_coverage, AutomationCoverage};
pub use engine::AssessmentRuntime;
pub use evaluator::{require_payload, Evaluator, EvaluatorRegistry};
pub use types::{
    AssessmentRun, Confidence, ControlResult, EvalContext, Evidence, IntentResult, IntentStatus,
    NextCheck, RunPhase,
};
