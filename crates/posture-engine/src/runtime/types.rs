//! Result, context, and run-record types for the assessment runtime.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coverage::AutomationCoverage;
use crate::graph::{Deferral, DisciplineScore, EvaluationPlan, HasStatus, Question};
use crate::signals::EvalScope;
use crate::taxonomy::{ControlStatus, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Numeric score used when an evaluator does not supply one.
    pub fn default_score(&self) -> f64 {
        match self {
            Self::High => 0.9,
            Self::Medium => 0.7,
            Self::Low => 0.4,
        }
    }

    /// High only if every level is High, Low if any is Low, else Medium.
    /// An empty input is High.
    pub fn aggregate<I: IntoIterator<Item = Confidence>>(levels: I) -> Confidence {
        let mut all_high = true;
        for level in levels {
            match level {
                Self::Low => return Self::Low,
                Self::Medium => all_high = false,
                Self::High => {}
            }
        }
        if all_high {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One piece of evidence behind a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Evidence {
    pub fn new(kind: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            resource_id: None,
            summary: summary.into(),
            properties: Value::Null,
        }
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

/// Hint for a follow-up signal that would sharpen an uncertain verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCheck {
    pub signal: String,
    pub why: String,
}

/// Typed outcome of evaluating one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResult {
    pub control_id: String,
    pub status: ControlStatus,
    pub severity: Severity,
    pub confidence: Confidence,
    pub confidence_score: f64,
    pub reason: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub signals_used: Vec<String>,
    #[serde(default)]
    pub next_checks: Vec<NextCheck>,
}

impl ControlResult {
    /// Medium severity, High confidence, no reason. Evaluators fill in the rest.
    pub fn new(status: ControlStatus) -> Self {
        Self {
            control_id: String::new(),
            status,
            severity: Severity::Medium,
            confidence: Confidence::High,
            confidence_score: Confidence::High.default_score(),
            reason: String::new(),
            evidence: Vec::new(),
            signals_used: Vec::new(),
            next_checks: Vec::new(),
        }
    }

    pub fn pass(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::Pass).with_reason(reason)
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::Fail).with_reason(reason)
    }

    pub fn partial(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::Partial).with_reason(reason)
    }

    pub fn manual(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::Manual)
            .with_reason(reason)
            .with_confidence(Confidence::Low)
    }

    pub fn signal_error(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::SignalError)
            .with_reason(reason)
            .with_confidence(Confidence::Low)
    }

    pub fn evaluation_error(reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::EvaluationError)
            .with_reason(reason)
            .with_confidence(Confidence::Low)
    }

    /// Synthetic result for a control skipped because a parent failed.
    pub fn deferred(control_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ControlStatus::Deferred)
            .with_control_id(control_id)
            .with_reason(reason)
    }

    pub fn with_control_id(mut self, control_id: impl Into<String>) -> Self {
        self.control_id = control_id.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the level and resets the numeric score to the level's default.
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self.confidence_score = confidence.default_score();
        self
    }

    pub fn with_confidence_score(mut self, score: f64) -> Self {
        self.confidence_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn with_signals_used<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signals_used = signals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_next_check(mut self, signal: impl Into<String>, why: impl Into<String>) -> Self {
        self.next_checks.push(NextCheck {
            signal: signal.into(),
            why: why.into(),
        });
        self
    }
}

impl HasStatus for ControlResult {
    fn status(&self) -> ControlStatus {
        self.status
    }
}

/// Everything an evaluator may know about the call besides the signals.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub scope: EvalScope,
    pub run_id: String,
    pub control_id: String,
    pub full_id: String,
    pub options: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStatus {
    Ready,
    NotReady,
    Partial,
}

impl IntentStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
            Self::Partial => "Partial",
        }
    }
}

/// Aggregate over one completed plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub intent: String,
    pub status: IntentStatus,
    pub summary: String,
    pub controls_evaluated: usize,
    pub passed_controls: Vec<String>,
    pub failed_controls: Vec<String>,
    pub deferred_controls: Vec<String>,
    pub data_confidence: Confidence,
    pub discipline_scores: BTreeMap<String, DisciplineScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planned,
    Preflight,
    Evaluating,
    Questions,
    Done,
}

/// Full record of one `execute_intent` call.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRun {
    pub run_id: String,
    pub plan: EvaluationPlan,
    /// Keyed by short id.
    pub results: BTreeMap<String, ControlResult>,
    pub intent: IntentResult,
    pub deferrals: Vec<Deferral>,
    pub questions: Vec<Question>,
    pub phases: Vec<RunPhase>,
    pub coverage: AutomationCoverage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_one_weak_link_pulls_down() {
        use Confidence::*;
        assert_eq!(Confidence::aggregate([High, High]), High);
        assert_eq!(Confidence::aggregate([High, Medium]), Medium);
        assert_eq!(Confidence::aggregate([High, Medium, Low]), Low);
        assert_eq!(Confidence::aggregate([]), High);
    }

    #[test]
    fn deferred_result_shape() {
        let r = ControlResult::deferred("61623a76", "Deferred: parent 2df27ee4 failed");
        assert_eq!(r.status, ControlStatus::Deferred);
        assert_eq!(r.severity, Severity::Medium);
        assert_eq!(r.confidence, Confidence::High);
        assert!(r.signals_used.is_empty());
    }

    #[test]
    fn evidence_serialises_kind_as_type() {
        let e = Evidence::new("resource", "Azure Firewall present").with_resource("/subs/x/fw");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "resource");
        assert!(json.get("properties").is_none());
    }
}
