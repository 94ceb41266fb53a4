//! Small in-memory graphs for unit tests.

use std::collections::BTreeMap;

use posture_core::config::GraphConfig;
use serde_json::json;

use super::control_graph::ControlGraph;
use super::types::{DisciplineWeight, GraphDefinition, IntentBundle, NodeDefinition};
use crate::taxonomy::{validate_and_build, RawCatalog};

/// Build a graph from `(id, "parent,parent")` pairs. Every control reads
/// `sig:{id}`, defers on parent failure, and affects `governance` with
/// weight 1.0.
pub(crate) fn graph_from(edges: &[(&str, &str)]) -> ControlGraph {
    let mut raw = RawCatalog::default();
    let mut definition = GraphDefinition::default();
    for (id, parents) in edges {
        let parents: Vec<String> = parents
            .split(',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        raw.controls.insert(
            (*id).to_string(),
            json!({
                "name": format!("Control {id}"),
                "full_id": format!("{id}-full"),
                "design_area": "governance",
                "sub_area": "Test",
                "waf_pillar": "Operational Excellence",
                "control_type": "ALZ",
                "severity": "Medium",
                "evaluation_logic": "automated",
                "evaluator_module": format!("test.{id}"),
                "required_signals": [format!("sig:{id}")],
            }),
        );
        definition.controls.insert(
            (*id).to_string(),
            NodeDefinition {
                depends_on: parents.clone(),
                defer_if_parent_fails: !parents.is_empty(),
                affects: vec![DisciplineWeight {
                    discipline: "governance".to_string(),
                    weight: 1.0,
                }],
                question_resolvers: Vec::new(),
                caf_reference: None,
            },
        );
    }
    definition.intent_bundles = BTreeMap::from([(
        "all".to_string(),
        IntentBundle {
            description: String::new(),
            controls: edges.iter().map(|(id, _)| (*id).to_string()).collect(),
        },
    )]);

    let catalog = validate_and_build(&raw).expect("test catalog is valid");
    ControlGraph::build(&catalog, definition, &GraphConfig::default()).expect("test graph builds")
}
