//! Control graph: dependency edges, deterministic planning, deferral
//! propagation, and discipline scoring.

pub mod control_graph;
pub mod planner;
pub mod scoring;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use control_graph::ControlGraph;
pub use planner::CUSTOM_INTENT;
pub use types::{
    BundleSummary, ControlNode, Deferral, DisciplineScore, DisciplineWeight, GraphDefinition,
    GraphSummary, HasStatus, IntentBundle, NodeDefinition, Question, QuestionDefinition,
    EvaluationPlan, StatusView,
};
