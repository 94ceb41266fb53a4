//! Frozen control definitions and the catalog that owns them.

use std::collections::BTreeMap;
use std::sync::Arc;

use posture_core::types::collections::FxHashMap;
use serde::Serialize;

use super::vocabulary::{ControlType, DesignArea, EvaluationMode, Section, Severity, WafPillar};

/// A validated, immutable control.
///
/// Only [`super::validate_and_build`] constructs these, after the whole
/// catalog has passed validation. There are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlDefinition {
    control_id: String,
    full_id: String,
    title: String,
    design_area: DesignArea,
    sub_area: String,
    waf_pillar: WafPillar,
    control_type: ControlType,
    severity: Severity,
    evaluation_mode: EvaluationMode,
    evaluator_module: String,
    required_signals: Vec<String>,
    caf_guidance: String,
    caf_url: String,
    signal_category: Option<String>,
    section: Section,
    weight: f64,
}

/// Validated field values, handed from the validator to the constructor.
#[derive(Debug)]
pub(crate) struct ControlFields {
    pub control_id: String,
    pub full_id: String,
    pub title: String,
    pub design_area: DesignArea,
    pub sub_area: String,
    pub waf_pillar: WafPillar,
    pub control_type: ControlType,
    pub severity: Severity,
    pub evaluation_mode: EvaluationMode,
    pub evaluator_module: String,
    pub required_signals: Vec<String>,
    pub caf_guidance: String,
    pub caf_url: String,
    pub signal_category: Option<String>,
}

impl ControlDefinition {
    pub(crate) fn from_fields(fields: ControlFields) -> Self {
        let section = fields.design_area.section();
        Self {
            control_id: fields.control_id,
            full_id: fields.full_id,
            title: fields.title,
            design_area: fields.design_area,
            sub_area: fields.sub_area,
            waf_pillar: fields.waf_pillar,
            control_type: fields.control_type,
            severity: fields.severity,
            evaluation_mode: fields.evaluation_mode,
            evaluator_module: fields.evaluator_module,
            required_signals: fields.required_signals,
            caf_guidance: fields.caf_guidance,
            caf_url: fields.caf_url,
            signal_category: fields.signal_category,
            section,
            weight: section.weight(),
        }
    }

    /// Short catalog key, e.g. `e6c4cfd3`.
    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    /// Stable long-form identifier the evaluator registry is keyed by.
    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn design_area(&self) -> DesignArea {
        self.design_area
    }

    pub fn sub_area(&self) -> &str {
        &self.sub_area
    }

    /// Remediation work is grouped by sub-area.
    pub fn remediation_group(&self) -> &str {
        &self.sub_area
    }

    pub fn waf_pillar(&self) -> WafPillar {
        self.waf_pillar
    }

    pub fn control_type(&self) -> ControlType {
        self.control_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }

    pub fn evaluator_module(&self) -> &str {
        &self.evaluator_module
    }

    /// Signals in authored order. Never empty.
    pub fn required_signals(&self) -> &[String] {
        &self.required_signals
    }

    pub fn caf_guidance(&self) -> &str {
        &self.caf_guidance
    }

    pub fn caf_url(&self) -> &str {
        &self.caf_url
    }

    pub fn signal_category(&self) -> Option<&str> {
        self.signal_category.as_deref()
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// The full set of validated controls for a run, frozen after build.
#[derive(Debug, Clone, Default)]
pub struct ControlCatalog {
    controls: BTreeMap<String, Arc<ControlDefinition>>,
    by_full_id: FxHashMap<String, String>,
    areas: BTreeMap<DesignArea, Vec<String>>,
}

impl ControlCatalog {
    pub(crate) fn new(
        controls: BTreeMap<String, Arc<ControlDefinition>>,
        areas: BTreeMap<DesignArea, Vec<String>>,
    ) -> Self {
        let by_full_id = controls
            .values()
            .map(|c| (c.full_id().to_string(), c.control_id().to_string()))
            .collect();
        Self {
            controls,
            by_full_id,
            areas,
        }
    }

    pub fn get(&self, control_id: &str) -> Option<&Arc<ControlDefinition>> {
        self.controls.get(control_id)
    }

    pub fn get_by_full_id(&self, full_id: &str) -> Option<&Arc<ControlDefinition>> {
        self.by_full_id
            .get(full_id)
            .and_then(|short| self.controls.get(short))
    }

    /// Accepts either a short id or a long-form id.
    pub fn resolve(&self, id: &str) -> Option<&Arc<ControlDefinition>> {
        self.get(id).or_else(|| self.get_by_full_id(id))
    }

    pub fn contains(&self, control_id: &str) -> bool {
        self.controls.contains_key(control_id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Controls in short-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ControlDefinition>> {
        self.controls.values()
    }

    pub fn control_ids(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    /// Short ids indexed under `area`, in index order.
    pub fn controls_in_area(&self, area: DesignArea) -> &[String] {
        self.areas.get(&area).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total section weight of the catalog, used to normalise scores.
    pub fn total_weight(&self) -> f64 {
        self.controls.values().map(|c| c.weight()).sum()
    }
}
