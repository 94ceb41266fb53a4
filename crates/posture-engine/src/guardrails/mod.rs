//! Post-hoc validators over assembled output.
//!
//! Three gates run in order: evidence refs, relationship integrity, and
//! content. Any violation blocks rendering; run data is untouched.

pub mod content;
pub mod evidence;
pub mod integrity;
pub mod trajectory;
pub mod types;

pub use content::{
    check_confidence_has_basis, check_no_compliance_claims, check_no_cost_numbers, compute_derived_confidence,
    validate_content, validate_doc_refs,
};
pub use evidence::{evidence_is_empty, merge_evidence_refs, validate_evidence_refs, validate_grounded};
pub use integrity::validate_relationship_integrity;
pub use trajectory::{compute_maturity_trajectory, initiative_id_for};
pub use types::{
    AssembledOutput, Blocker, CostDriver, CriticalTrack, DecisionImpact, DerivedConfidence, DocRef, DriftModel,
    EvidenceRefs, Grounded, Initiative, MaturityTrajectory, Recommendation, ResolvedByPhase, Roadmap, RoadmapEntry,
    RoadmapPhase, ScalingImpact,
};

use posture_core::config::GuardrailConfig;
use posture_core::errors::GuardrailError;
use posture_core::events::{EventDispatcher, GuardrailViolationEvent};
use serde::Serialize;
use tracing::{info, warn};

pub const GATE_EVIDENCE: &str = "evidence";
pub const GATE_INTEGRITY: &str = "integrity";
pub const GATE_CONTENT: &str = "content";

/// Violations from every gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuardrailReport {
    pub evidence: Vec<String>,
    pub integrity: Vec<String>,
    pub content: Vec<String>,
}

impl GuardrailReport {
    pub fn is_clean(&self) -> bool {
        self.evidence.is_empty() && self.integrity.is_empty() && self.content.is_empty()
    }

    pub fn total(&self) -> usize {
        self.evidence.len() + self.integrity.len() + self.content.len()
    }

    /// (gate, violation) pairs in gate order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        let evidence = self.evidence.iter().map(|s| (GATE_EVIDENCE, s.as_str()));
        let integrity = self.integrity.iter().map(|s| (GATE_INTEGRITY, s.as_str()));
        let content = self.content.iter().map(|s| (GATE_CONTENT, s.as_str()));
        evidence.chain(integrity).chain(content)
    }
}

/// Run every gate and collect violations without failing.
pub fn validate_assembled_output(output: &AssembledOutput, config: &GuardrailConfig) -> GuardrailReport {
    let report = GuardrailReport {
        evidence: {
            let _span = posture_core::guardrails_span!(GATE_EVIDENCE).entered();
            validate_evidence_refs(output)
        },
        integrity: {
            let _span = posture_core::guardrails_span!(GATE_INTEGRITY).entered();
            validate_relationship_integrity(output, config.effective_enforce_checklist_format())
        },
        content: {
            let _span = posture_core::guardrails_span!(GATE_CONTENT).entered();
            validate_content(output, config.effective_cost_mode())
        },
    };
    info!(
        evidence = report.evidence.len(),
        integrity = report.integrity.len(),
        content = report.content.len(),
        "guardrails evaluated"
    );
    report
}

/// Gate rendering on a clean report.
///
/// Every violation is emitted as an event. Integrity failures take
/// precedence in the returned error; evidence and content violations are
/// reported together.
pub fn require_renderable(
    output: &AssembledOutput,
    config: &GuardrailConfig,
    events: &EventDispatcher,
) -> Result<GuardrailReport, GuardrailError> {
    let report = validate_assembled_output(output, config);
    for (gate, violation) in report.iter() {
        warn!(gate, violation, "guardrail violation");
        events.emit_guardrail_violation(&GuardrailViolationEvent {
            gate,
            violation: violation.to_string(),
        });
    }
    if !report.integrity.is_empty() {
        return Err(GuardrailError::Integrity(report.integrity));
    }
    if !report.evidence.is_empty() || !report.content.is_empty() {
        let mut violations = report.evidence;
        violations.extend(report.content);
        return Err(GuardrailError::Evidence(violations));
    }
    Ok(report)
}
