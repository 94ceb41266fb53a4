//! Relationship-integrity gate: cross-references between derived objects.
//!
//! Violations are prefixed with a stable code in brackets, e.g.
//! `[BLOCKER_REF]`, so callers can group them without parsing prose.

use std::collections::BTreeSet;

use super::content::checklist_pattern;
use super::types::{AssembledOutput, MaturityTrajectory, RoadmapPhase};

/// Tolerance between a stored phase value and its re-derived value.
const FORMULA_TOLERANCE: f64 = 0.05;

/// Movement below this is treated as rounding noise.
const DRIFT_TOLERANCE: f64 = 0.01;

pub fn validate_relationship_integrity(
    output: &AssembledOutput,
    enforce_checklist_format: bool,
) -> Vec<String> {
    let mut violations = Vec::new();
    let initiative_ids = check_initiatives(output, enforce_checklist_format, &mut violations);
    check_blockers(output, &initiative_ids, &mut violations);
    check_roadmap(output, &initiative_ids, &mut violations);
    if let Some(trajectory) = &output.trajectory {
        check_trajectory(trajectory, &mut violations);
    }
    violations
}

fn check_initiatives(
    output: &AssembledOutput,
    enforce_checklist_format: bool,
    violations: &mut Vec<String>,
) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for (i, init) in output.initiatives.iter().enumerate() {
        let Some(id) = init.initiative_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            violations.push(format!("[INIT_NO_ID] initiative[{i}] '{}' has no initiative_id", init.title));
            continue;
        };
        if !ids.insert(id.to_string()) {
            violations.push(format!("[INIT_DUPLICATE_ID] initiative_id '{id}' appears more than once"));
        }
        if init.controls.is_empty() {
            violations.push(format!("[INIT_NO_CONTROLS] {id}: references no controls"));
        }
        if init.checklist_ids.is_empty() {
            violations.push(format!("[INIT_NO_CHECKLIST] {id}: references no checklist items"));
        } else if enforce_checklist_format {
            match checklist_pattern() {
                Ok(re) => {
                    for item in init.checklist_ids.iter().filter(|c| !re.is_match(c)) {
                        violations.push(format!(
                            "[INIT_INVALID_CHECKLIST] {id}: checklist id '{item}' does not match X00.00"
                        ));
                    }
                }
                Err(v) => violations.push(v),
            }
        }
    }
    ids
}

fn check_blockers(output: &AssembledOutput, initiative_ids: &BTreeSet<String>, violations: &mut Vec<String>) {
    for (i, blocker) in output.blockers.iter().enumerate() {
        let label = format!("blocker[{i}] ({})", blocker.category);
        let Some(target) = blocker.resolving_initiative.as_deref().filter(|t| !t.trim().is_empty()) else {
            violations.push(format!("[BLOCKER_NULL_REF] {label}: resolving_initiative is missing"));
            continue;
        };
        if initiative_ids.contains(target) {
            continue;
        }
        if looks_like_title(target) {
            violations.push(format!(
                "[BLOCKER_TITLE_REF] {label}: resolving_initiative '{target}' is a title, not an initiative id"
            ));
        } else {
            violations.push(format!(
                "[BLOCKER_REF] {label}: resolving_initiative '{target}' does not name an initiative"
            ));
        }
    }
}

fn check_roadmap(output: &AssembledOutput, initiative_ids: &BTreeSet<String>, violations: &mut Vec<String>) {
    for phase in RoadmapPhase::ALL {
        for (i, entry) in output.roadmap.phase(phase).iter().enumerate() {
            let key = phase.key();
            match entry.initiative_id.as_deref().filter(|id| !id.trim().is_empty()) {
                None => violations.push(format!("[ROADMAP_NO_ID] roadmap.{key}[{i}]: missing initiative_id")),
                Some(id) if !initiative_ids.contains(id) => violations.push(format!(
                    "[ROADMAP_REF] roadmap.{key}[{i}]: initiative_id '{id}' does not name an initiative"
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_trajectory(trajectory: &MaturityTrajectory, violations: &mut Vec<String>) {
    let resolved = &trajectory.controls_resolved_by_phase;
    for phase in RoadmapPhase::ALL {
        let before = trajectory.before(phase);
        let after = trajectory.after(phase);
        let key = phase.key();
        if resolved.in_phase(phase) == 0 {
            if (after - before).abs() > DRIFT_TOLERANCE {
                violations.push(format!(
                    "[TRAJECTORY_DRIFT] {key}: maturity moved {before:.1}% -> {after:.1}% with zero controls resolved"
                ));
            }
            continue;
        }
        if trajectory.total_controls == 0 {
            continue;
        }
        let expected = round1(
            (trajectory.current_passing + resolved.through(phase)) as f64 / trajectory.total_controls as f64
                * 100.0,
        );
        if (after - expected).abs() > FORMULA_TOLERANCE {
            violations.push(format!(
                "[TRAJECTORY_FORMULA] {key}: stored {after:.1}% but passing + resolved gives {expected:.1}%"
            ));
        }
    }
}

/// Ids are single tokens; anything with whitespace is prose.
fn looks_like_title(value: &str) -> bool {
    value.trim().contains(char::is_whitespace)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
