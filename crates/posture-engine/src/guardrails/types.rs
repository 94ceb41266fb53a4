//! Assembled (derived) output as handed to the guardrails.
//!
//! Everything here is produced downstream of the runtime: blockers,
//! initiatives, roadmap, trajectory, and the simulation models. Fields the
//! gates check are `Option` so "absent" and "present but empty" stay
//! distinguishable after deserialisation.

use serde::{Deserialize, Serialize};

/// Where a derived conclusion came from. At least one bucket must be
/// non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRefs {
    #[serde(default)]
    pub controls: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub mcp_queries: Vec<String>,
}

impl EvidenceRefs {
    pub fn is_empty(&self) -> bool {
        self.buckets().iter().all(|b| b.is_empty())
    }

    pub fn with_controls<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.controls.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_signals<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.signals.extend(names.into_iter().map(Into::into));
        self
    }

    pub(crate) fn buckets(&self) -> [&Vec<String>; 5] {
        [
            &self.controls,
            &self.risks,
            &self.blockers,
            &self.signals,
            &self.mcp_queries,
        ]
    }

    pub(crate) fn buckets_mut(&mut self) -> [&mut Vec<String>; 5] {
        [
            &mut self.controls,
            &mut self.risks,
            &mut self.blockers,
            &mut self.signals,
            &mut self.mcp_queries,
        ]
    }
}

/// Computed confidence for a derived object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedConfidence {
    pub value: f64,
    pub basis: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Initiative id, never a title.
    #[serde(default)]
    pub resolving_initiative: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initiative {
    #[serde(default)]
    pub initiative_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub controls: Vec<String>,
    /// Grounding-catalog items, e.g. `D07.01`.
    #[serde(default)]
    pub checklist_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoadmapPhase {
    #[serde(rename = "30_days")]
    Days30,
    #[serde(rename = "60_days")]
    Days60,
    #[serde(rename = "90_days")]
    Days90,
}

impl RoadmapPhase {
    pub const ALL: [RoadmapPhase; 3] = [Self::Days30, Self::Days60, Self::Days90];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Days30 => "30_days",
            Self::Days60 => "60_days",
            Self::Days90 => "90_days",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapEntry {
    #[serde(default)]
    pub initiative_id: Option<String>,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(rename = "30_days", default)]
    pub days_30: Vec<RoadmapEntry>,
    #[serde(rename = "60_days", default)]
    pub days_60: Vec<RoadmapEntry>,
    #[serde(rename = "90_days", default)]
    pub days_90: Vec<RoadmapEntry>,
}

impl Roadmap {
    pub fn phase(&self, phase: RoadmapPhase) -> &[RoadmapEntry] {
        match phase {
            RoadmapPhase::Days30 => &self.days_30,
            RoadmapPhase::Days60 => &self.days_60,
            RoadmapPhase::Days90 => &self.days_90,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedByPhase {
    #[serde(rename = "30_days", default)]
    pub days_30: usize,
    #[serde(rename = "60_days", default)]
    pub days_60: usize,
    #[serde(rename = "90_days", default)]
    pub days_90: usize,
    #[serde(default)]
    pub cumulative_90: usize,
}

impl ResolvedByPhase {
    pub fn in_phase(&self, phase: RoadmapPhase) -> usize {
        match phase {
            RoadmapPhase::Days30 => self.days_30,
            RoadmapPhase::Days60 => self.days_60,
            RoadmapPhase::Days90 => self.days_90,
        }
    }

    /// Resolved in `phase` and every phase before it.
    pub fn through(&self, phase: RoadmapPhase) -> usize {
        RoadmapPhase::ALL
            .iter()
            .take_while(|p| **p <= phase)
            .map(|p| self.in_phase(*p))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalTrack {
    pub current_percent: f64,
    pub post_30_day_percent: f64,
    pub post_60_day_percent: f64,
    pub post_90_day_percent: f64,
    pub total_critical_controls: usize,
}

/// Projected maturity per roadmap phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaturityTrajectory {
    pub current_percent: f64,
    pub post_30_day_percent: f64,
    pub post_60_day_percent: f64,
    pub post_90_day_percent: f64,
    #[serde(default)]
    pub controls_resolved_by_phase: ResolvedByPhase,
    #[serde(default)]
    pub critical_track: CriticalTrack,
    /// Denominator used for the projection. Zero disables formula checks.
    #[serde(default)]
    pub total_controls: usize,
    #[serde(default)]
    pub current_passing: usize,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

impl MaturityTrajectory {
    /// Value at the end of `phase`.
    pub fn after(&self, phase: RoadmapPhase) -> f64 {
        match phase {
            RoadmapPhase::Days30 => self.post_30_day_percent,
            RoadmapPhase::Days60 => self.post_60_day_percent,
            RoadmapPhase::Days90 => self.post_90_day_percent,
        }
    }

    /// Value at the start of `phase`.
    pub fn before(&self, phase: RoadmapPhase) -> f64 {
        match phase {
            RoadmapPhase::Days30 => self.current_percent,
            RoadmapPhase::Days60 => self.post_30_day_percent,
            RoadmapPhase::Days90 => self.post_60_day_percent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionImpact {
    #[serde(default)]
    pub initiative_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<DerivedConfidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingImpact {
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftModel {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostDriver {
    #[serde(default)]
    pub initiative_id: String,
    /// Category label (Low/Medium/High), or a figure when tool-backed.
    #[serde(default)]
    pub estimated_monthly_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub section: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub doc_refs: Vec<DocRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<DerivedConfidence>,
}

/// Everything derived from a run, in the shape reporting consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledOutput {
    #[serde(default)]
    pub blockers: Vec<Blocker>,
    #[serde(default)]
    pub initiatives: Vec<Initiative>,
    #[serde(default)]
    pub roadmap: Roadmap,
    #[serde(default)]
    pub trajectory: Option<MaturityTrajectory>,
    #[serde(default)]
    pub decision_impacts: Vec<DecisionImpact>,
    #[serde(default)]
    pub scaling_impacts: Vec<ScalingImpact>,
    #[serde(default)]
    pub drift_model: Option<DriftModel>,
    #[serde(default)]
    pub cost_drivers: Vec<CostDriver>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// A derived object subject to the evidence gate.
pub trait Grounded {
    /// Human-readable locator used in violation messages.
    fn label(&self) -> String;
    fn evidence_refs(&self) -> Option<&EvidenceRefs>;
    fn assumptions(&self) -> Option<&[String]>;
}

macro_rules! impl_grounded {
    ($ty:ty, |$this:ident| $label:expr) => {
        impl Grounded for $ty {
            fn label(&self) -> String {
                let $this = self;
                $label
            }

            fn evidence_refs(&self) -> Option<&EvidenceRefs> {
                self.evidence_refs.as_ref()
            }

            fn assumptions(&self) -> Option<&[String]> {
                self.assumptions.as_deref()
            }
        }
    };
}

impl_grounded!(Initiative, |i| format!(
    "initiative[{}]",
    i.initiative_id.as_deref().unwrap_or("?")
));
impl_grounded!(DecisionImpact, |d| format!("decision_impact[{}]", d.initiative_id));
impl_grounded!(ScalingImpact, |s| format!("scaling_impact[{}].{}", s.scenario, s.rule_id));
impl_grounded!(DriftModel, |_d| "drift_model".to_string());
impl_grounded!(CostDriver, |c| format!("cost_driver[{}]", c.initiative_id));
