//! # posture-engine
//!
//! Deterministic landing-zone assessment engine.
//!
//! Leaf-first: [`taxonomy`] validates and freezes control definitions,
//! [`signals`] deduplicates provider fetches per scope, [`graph`] plans
//! evaluation order and deferrals, [`runtime`] drives a plan against the
//! bus and evaluator registry, and [`guardrails`] refuses to hand derived
//! output to a renderer unless every reference resolves.

pub mod catalog;
pub mod graph;
pub mod guardrails;
pub mod runtime;
pub mod signals;
pub mod taxonomy;

pub use catalog::ControlPack;
pub use graph::{ControlGraph, EvaluationPlan};
pub use runtime::{AssessmentRuntime, ControlResult, IntentResult};
pub use signals::{EvalScope, SignalBus, SignalResult};
pub use taxonomy::{ControlCatalog, ControlDefinition, ControlStatus};
