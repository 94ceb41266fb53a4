//! ControlGraph: catalog controls joined with their dependency edges.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use posture_core::config::GraphConfig;
use posture_core::errors::GraphError;
use posture_core::types::collections::FxHashMap;
use tracing::{debug, warn};

use super::types::{
    ControlNode, GraphDefinition, IntentBundle, NodeDefinition, QuestionDefinition,
};
use crate::taxonomy::ControlCatalog;

/// The loaded control graph. Read-only after [`ControlGraph::build`].
#[derive(Debug, Clone)]
pub struct ControlGraph {
    pub(crate) nodes: BTreeMap<String, ControlNode>,
    pub(crate) full_ids: FxHashMap<String, String>,
    pub(crate) dependents: FxHashMap<String, Vec<String>>,
    pub(crate) bundles: BTreeMap<String, IntentBundle>,
    pub(crate) questions: BTreeMap<String, QuestionDefinition>,
    pub(crate) disciplines: BTreeMap<String, String>,
    pub(crate) cycles: Vec<Vec<String>>,
}

impl ControlGraph {
    /// Join catalog controls with their graph entries.
    ///
    /// Every catalog control becomes a node; controls without a graph entry
    /// have no edges. A graph entry for a control missing from the catalog
    /// is an error. Cycles are logged, or rejected when
    /// `strict_cycles` is set.
    pub fn build(
        catalog: &ControlCatalog,
        mut definition: GraphDefinition,
        config: &GraphConfig,
    ) -> Result<Self, GraphError> {
        if let Some(orphan) = definition
            .controls
            .keys()
            .find(|id| !catalog.contains(id.as_str()))
        {
            return Err(GraphError::InvalidDefinition(format!(
                "graph entry '{orphan}' has no control in the catalog"
            )));
        }

        let mut nodes = BTreeMap::new();
        let mut full_ids = FxHashMap::default();
        for control in catalog.iter() {
            let raw = definition
                .controls
                .remove(control.control_id())
                .unwrap_or_else(NodeDefinition::default);
            full_ids.insert(control.full_id().to_string(), control.control_id().to_string());
            nodes.insert(
                control.control_id().to_string(),
                ControlNode::new(std::sync::Arc::clone(control), raw),
            );
        }

        let mut dependents: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for node in nodes.values() {
            for parent in node.depends_on() {
                if nodes.contains_key(parent) {
                    dependents
                        .entry(parent.clone())
                        .or_default()
                        .push(node.control_id().to_string());
                } else {
                    warn!(
                        control = node.control_id(),
                        parent = parent.as_str(),
                        "depends_on names a control outside the graph; edge ignored"
                    );
                }
            }
            for qid in node.question_resolvers() {
                if !definition.question_resolvers.contains_key(qid) {
                    warn!(control = node.control_id(), question = qid.as_str(), "unknown question resolver");
                }
            }
        }
        for children in dependents.values_mut() {
            children.sort();
        }

        for (intent, bundle) in &definition.intent_bundles {
            for id in bundle.controls.iter().filter(|id| !nodes.contains_key(*id)) {
                warn!(intent = intent.as_str(), control = id.as_str(), "bundle control not in graph");
            }
        }

        let cycles = find_cycles(&nodes);
        if !cycles.is_empty() {
            if config.effective_strict_cycles() {
                return Err(GraphError::CycleDetected {
                    members: cycles[0].clone(),
                });
            }
            for members in &cycles {
                warn!(members = %members.join(", "), "dependency cycle; members will be appended to plans in sorted order");
            }
        }

        debug!(
            controls = nodes.len(),
            bundles = definition.intent_bundles.len(),
            questions = definition.question_resolvers.len(),
            "control graph built"
        );

        Ok(Self {
            nodes,
            full_ids,
            dependents,
            bundles: definition.intent_bundles,
            questions: definition.question_resolvers,
            disciplines: definition.caf_disciplines,
            cycles,
        })
    }

    pub fn node(&self, control_id: &str) -> Option<&ControlNode> {
        self.nodes.get(control_id)
    }

    pub fn node_by_full_id(&self, full_id: &str) -> Option<&ControlNode> {
        self.full_ids.get(full_id).and_then(|short| self.nodes.get(short))
    }

    /// Look up by short id first, then long-form id.
    pub fn resolve(&self, id: &str) -> Option<&ControlNode> {
        self.node(id).or_else(|| self.node_by_full_id(id))
    }

    /// Long-form id for a short id.
    pub fn resolve_full_id(&self, control_id: &str) -> Option<&str> {
        self.nodes.get(control_id).map(ControlNode::full_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ControlNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Intent bundle names, sorted.
    pub fn bundle_names(&self) -> Vec<&str> {
        self.bundles.keys().map(String::as_str).collect()
    }

    pub fn bundle(&self, intent: &str) -> Option<&IntentBundle> {
        self.bundles.get(intent)
    }

    pub fn discipline_label<'a>(&'a self, discipline: &'a str) -> &'a str {
        self.disciplines
            .get(discipline)
            .map(String::as_str)
            .unwrap_or(discipline)
    }

    /// Controls that list `control_id` as a direct parent, sorted.
    pub fn get_dependents(&self, control_id: &str) -> &[String] {
        self.dependents
            .get(control_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All transitive parents of `control_id`, sorted. Unknown ids have none.
    pub fn get_ancestors(&self, control_id: &str) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<&str> = self
            .nodes
            .get(control_id)
            .map(|n| n.depends_on().iter().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(parent) = queue.pop_front() {
            if !visited.insert(parent.to_string()) {
                continue;
            }
            if let Some(node) = self.nodes.get(parent) {
                queue.extend(node.depends_on().iter().map(String::as_str));
            }
        }
        visited.into_iter().collect()
    }

    /// Strongly connected components with more than one member, or a
    /// self-dependency, found at load.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }
}

fn find_cycles(nodes: &BTreeMap<String, ControlNode>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(nodes.len(), nodes.len());
    let mut index: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    for id in nodes.keys() {
        index.insert(id.as_str(), graph.add_node(id.as_str()));
    }
    for node in nodes.values() {
        let Some(&child) = index.get(node.control_id()) else {
            continue;
        };
        for parent in node.depends_on() {
            if let Some(&p) = index.get(parent.as_str()) {
                graph.add_edge(p, child, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1 || scc.iter().any(|&ix| graph.contains_edge(ix, ix))
        })
        .map(|scc| {
            let mut members: Vec<String> = scc.iter().map(|&ix| graph[ix].to_string()).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();
    cycles
}
