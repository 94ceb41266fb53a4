//! Planning: dependency expansion, deterministic topological order,
//! deferral propagation, and parallel wave layout.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use posture_core::errors::GraphError;
use posture_core::types::collections::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::control_graph::ControlGraph;
use super::types::{Deferral, EvaluationPlan, StatusView};

/// Intent name used for plans built from an ad-hoc id set.
pub const CUSTOM_INTENT: &str = "custom";

impl ControlGraph {
    /// Plan a named intent bundle.
    pub fn plan_evaluation(&self, intent: &str) -> Result<EvaluationPlan, GraphError> {
        let _span = posture_core::plan_span!(intent).entered();
        let bundle = self.bundles.get(intent).ok_or_else(|| GraphError::UnknownIntent {
            intent: intent.to_string(),
            available: self.bundles.keys().cloned().collect(),
        })?;
        Ok(self.plan_for(&bundle.controls, intent))
    }

    /// Plan an arbitrary set of controls, short or long-form ids.
    ///
    /// Transitive parents are pulled in; ids the graph does not know are
    /// dropped.
    pub fn plan_from_ids<S: AsRef<str>>(&self, ids: &[S]) -> EvaluationPlan {
        let _span = posture_core::plan_span!(CUSTOM_INTENT).entered();
        self.plan_for(ids, CUSTOM_INTENT)
    }

    fn plan_for<S: AsRef<str>>(&self, ids: &[S], intent: &str) -> EvaluationPlan {
        let mut expanded: BTreeSet<String> = BTreeSet::new();
        for id in ids {
            let id = id.as_ref();
            let short = self
                .resolve(id)
                .map_or_else(|| id.to_string(), |n| n.control_id().to_string());
            expanded.extend(self.get_ancestors(&short));
            expanded.insert(short);
        }
        expanded.retain(|id| self.nodes.contains_key(id));

        let ordered = self.topo_sort(&expanded);

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut signals = Vec::new();
        let mut weights: BTreeMap<String, f64> = BTreeMap::new();
        let mut questions: BTreeSet<String> = BTreeSet::new();
        for id in &ordered {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for signal in node.required_signals() {
                if seen.insert(signal.as_str()) {
                    signals.push(signal.clone());
                }
            }
            for affect in node.affects() {
                *weights.entry(affect.discipline.clone()).or_insert(0.0) += affect.weight;
            }
            questions.extend(node.question_resolvers().iter().cloned());
        }

        debug!(
            intent,
            controls = ordered.len(),
            signals = signals.len(),
            "evaluation plan built"
        );

        EvaluationPlan::new(
            intent.to_string(),
            ordered,
            signals,
            weights,
            questions.into_iter().collect(),
        )
    }

    /// Kahn's algorithm over `ids`, edges restricted to the set.
    ///
    /// The initial frontier is sorted and each node's released children
    /// are enqueued in sorted order, so the output is a pure function of
    /// the input set. Nodes left over by a cycle go last, sorted.
    fn topo_sort(&self, ids: &BTreeSet<String>) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> = ids.iter().map(|id| (id.as_str(), 0)).collect();
        let mut children: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

        for id in ids {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for parent in node.depends_on() {
                if ids.contains(parent) {
                    children.entry(parent.as_str()).or_default().push(id.as_str());
                    if let Some(degree) = in_degree.get_mut(id.as_str()) {
                        *degree += 1;
                    }
                }
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
            list.dedup();
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut ordered: Vec<String> = Vec::with_capacity(ids.len());

        while let Some(current) = queue.pop_front() {
            ordered.push(current.to_string());
            for &child in children.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree = degree.saturating_sub(count_edges(self, child, current));
                    if *degree == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if ordered.len() < ids.len() {
            let placed: FxHashSet<&str> = ordered.iter().map(String::as_str).collect();
            let residual: Vec<String> = ids
                .iter()
                .filter(|id| !placed.contains(id.as_str()))
                .cloned()
                .collect();
            warn!(members = %residual.join(", "), "cycle in plan; appending members in sorted order");
            ordered.extend(residual);
        }
        ordered
    }

    /// Controls to skip given the statuses recorded so far.
    ///
    /// A control is deferred when it has no status yet, opts in with
    /// `defer_if_parent_fails`, and a declared parent blocks dependents.
    /// The first such parent in declaration order is reported.
    pub fn apply_deferrals(&self, plan: &EvaluationPlan, results: &impl StatusView) -> Vec<Deferral> {
        let mut blocked: FxHashSet<String> = FxHashSet::default();
        results.for_each_status(&mut |id, status| {
            if status.blocks_dependents() {
                blocked.insert(id.to_string());
            }
        });

        plan.ordered_controls()
            .iter()
            .filter(|id| results.status_of(id).is_none())
            .filter_map(|id| {
                let node = self.nodes.get(id)?;
                if !node.defer_if_parent_fails() {
                    return None;
                }
                let parent = node.depends_on().iter().find(|p| blocked.contains(*p))?;
                Some(Deferral {
                    control_id: id.clone(),
                    failed_parent: parent.clone(),
                    reason: format!("Deferred: parent {parent} failed"),
                })
            })
            .collect()
    }

    /// Group a plan into waves: every control's in-plan parents sit in an
    /// earlier wave. Within a wave, plan order is kept.
    ///
    /// Parents that come later in the plan (only possible inside a cycle)
    /// are ignored, so running waves in order visits each control after
    /// everything the sequential order would have visited first.
    pub fn plan_waves(&self, plan: &EvaluationPlan) -> Vec<Vec<String>> {
        let mut level: FxHashMap<&str, usize> = FxHashMap::default();
        let mut waves: Vec<Vec<String>> = Vec::new();

        for id in plan.ordered_controls() {
            let depth = self
                .nodes
                .get(id)
                .map(|node| {
                    node.depends_on()
                        .iter()
                        .filter_map(|p| level.get(p.as_str()))
                        .map(|l| l + 1)
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            level.insert(id.as_str(), depth);
            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(id.clone());
        }
        waves
    }
}

/// How many times `child` lists `parent`. Duplicate declarations add
/// duplicate in-degree, so release must subtract the same amount.
fn count_edges(graph: &ControlGraph, child: &str, parent: &str) -> usize {
    graph
        .nodes
        .get(child)
        .map_or(0, |n| n.depends_on().iter().filter(|p| *p == parent).count())
}
