//! Graph file schema, graph nodes, and planner outputs.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;

use posture_core::types::collections::SmallIds;
use serde::{Deserialize, Serialize};

use crate::taxonomy::{ControlDefinition, ControlStatus};

// ---- graph.json ----

/// Parsed `graph.json`. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Discipline key -> display label.
    #[serde(default)]
    pub caf_disciplines: BTreeMap<String, String>,
    #[serde(default)]
    pub question_resolvers: BTreeMap<String, QuestionDefinition>,
    #[serde(default)]
    pub controls: BTreeMap<String, NodeDefinition>,
    #[serde(default)]
    pub intent_bundles: BTreeMap<String, IntentBundle>,
}

impl GraphDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub defer_if_parent_fails: bool,
    #[serde(default)]
    pub affects: Vec<DisciplineWeight>,
    #[serde(default)]
    pub question_resolvers: Vec<String>,
    #[serde(default)]
    pub caf_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineWeight {
    pub discipline: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub question: String,
    #[serde(default)]
    pub resolves_controls: Vec<String>,
    #[serde(default)]
    pub resolution_effect: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentBundle {
    #[serde(default)]
    pub description: String,
    pub controls: Vec<String>,
}

// ---- nodes ----

/// A control definition plus its graph edges and discipline contributions.
#[derive(Debug, Clone)]
pub struct ControlNode {
    definition: Arc<ControlDefinition>,
    depends_on: SmallIds,
    defer_if_parent_fails: bool,
    affects: Vec<DisciplineWeight>,
    question_resolvers: SmallIds,
    caf_reference: Option<String>,
}

impl ControlNode {
    pub(crate) fn new(definition: Arc<ControlDefinition>, raw: NodeDefinition) -> Self {
        Self {
            definition,
            depends_on: SmallIds::from_vec(raw.depends_on),
            defer_if_parent_fails: raw.defer_if_parent_fails,
            affects: raw.affects,
            question_resolvers: SmallIds::from_vec(raw.question_resolvers),
            caf_reference: raw.caf_reference,
        }
    }

    pub fn control_id(&self) -> &str {
        self.definition.control_id()
    }

    pub fn full_id(&self) -> &str {
        self.definition.full_id()
    }

    pub fn definition(&self) -> &Arc<ControlDefinition> {
        &self.definition
    }

    /// Parent short ids, in declaration order.
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn defer_if_parent_fails(&self) -> bool {
        self.defer_if_parent_fails
    }

    pub fn affects(&self) -> &[DisciplineWeight] {
        &self.affects
    }

    pub fn question_resolvers(&self) -> &[String] {
        &self.question_resolvers
    }

    pub fn caf_reference(&self) -> Option<&str> {
        self.caf_reference.as_deref()
    }

    pub fn required_signals(&self) -> &[String] {
        self.definition.required_signals()
    }
}

// ---- planner outputs ----

/// Ordered evaluation plan for an intent or an ad-hoc id set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationPlan {
    intent: String,
    ordered_controls: Vec<String>,
    required_signals: Vec<String>,
    discipline_weights: BTreeMap<String, f64>,
    question_resolvers: Vec<String>,
}

impl EvaluationPlan {
    pub(crate) fn new(
        intent: String,
        ordered_controls: Vec<String>,
        required_signals: Vec<String>,
        discipline_weights: BTreeMap<String, f64>,
        question_resolvers: Vec<String>,
    ) -> Self {
        Self {
            intent,
            ordered_controls,
            required_signals,
            discipline_weights,
            question_resolvers,
        }
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    /// Short ids in dependency order, ties broken lexicographically.
    pub fn ordered_controls(&self) -> &[String] {
        &self.ordered_controls
    }

    /// Deduplicated signal names in first-seen order.
    pub fn required_signals(&self) -> &[String] {
        &self.required_signals
    }

    pub fn discipline_weights(&self) -> &BTreeMap<String, f64> {
        &self.discipline_weights
    }

    pub fn question_resolvers(&self) -> &[String] {
        &self.question_resolvers
    }

    pub fn contains(&self, control_id: &str) -> bool {
        self.ordered_controls.iter().any(|c| c == control_id)
    }

    pub fn len(&self) -> usize {
        self.ordered_controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_controls.is_empty()
    }
}

/// A control skipped because a declared parent failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferral {
    pub control_id: String,
    pub failed_parent: String,
    pub reason: String,
}

/// A question record, as handed to whoever asks the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub resolves_controls: Vec<String>,
    pub resolution_effect: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisciplineScore {
    pub discipline: String,
    pub label: String,
    /// 0-100.
    pub score: u32,
    pub weight_total: f64,
    pub pass_weight: f64,
    pub controls_counted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSummary {
    pub count: usize,
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub total_controls: usize,
    pub total_bundles: usize,
    pub total_questions: usize,
    pub disciplines: Vec<String>,
    pub bundles: BTreeMap<String, BundleSummary>,
    pub signal_sharing: BTreeMap<String, Vec<String>>,
    pub cycles: Vec<Vec<String>>,
}

// ---- status lookups ----

/// Anything that carries a control status.
pub trait HasStatus {
    fn status(&self) -> ControlStatus;
}

impl HasStatus for ControlStatus {
    fn status(&self) -> ControlStatus {
        *self
    }
}

/// Read access to the statuses recorded so far in a run.
///
/// Deferral and scoring only need statuses, so they accept any map of
/// results keyed by short id.
pub trait StatusView {
    fn status_of(&self, control_id: &str) -> Option<ControlStatus>;
    fn for_each_status(&self, f: &mut dyn FnMut(&str, ControlStatus));
}

impl<V: HasStatus> StatusView for BTreeMap<String, V> {
    fn status_of(&self, control_id: &str) -> Option<ControlStatus> {
        self.get(control_id).map(HasStatus::status)
    }

    fn for_each_status(&self, f: &mut dyn FnMut(&str, ControlStatus)) {
        for (id, v) in self {
            f(id, v.status());
        }
    }
}

impl<V: HasStatus, S: BuildHasher> StatusView for HashMap<String, V, S> {
    fn status_of(&self, control_id: &str) -> Option<ControlStatus> {
        self.get(control_id).map(HasStatus::status)
    }

    fn for_each_status(&self, f: &mut dyn FnMut(&str, ControlStatus)) {
        for (id, v) in self {
            f(id, v.status());
        }
    }
}
