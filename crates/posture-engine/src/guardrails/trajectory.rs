//! Deterministic maturity projection across the 30/60/90-day roadmap.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

use super::integrity::round1;
use super::types::{CriticalTrack, Initiative, MaturityTrajectory, ResolvedByPhase, RoadmapPhase};
use crate::runtime::ControlResult;
use crate::taxonomy::{ControlStatus, Severity};

/// Stable initiative id derived from the controls it covers.
pub fn initiative_id_for<S: AsRef<str>>(controls: &[S]) -> String {
    let mut ids: Vec<&str> = controls.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();
    ids.dedup();
    let hash = xxh3_64(ids.join(",").as_bytes());
    format!("INIT-{:08X}", hash >> 32)
}

/// Project maturity per phase, assuming every initiative control moves to
/// Pass when its initiative lands.
///
/// Only Pass/Fail/Partial results are assessed. A failing control named
/// by several initiatives resolves in the earliest phase that names it.
/// Initiatives with no phase assignment land in the 90-day phase.
/// `total_controls` overrides the assessed count as the denominator, but
/// never drops below it.
pub fn compute_maturity_trajectory(
    initiatives: &[Initiative],
    results: &BTreeMap<String, ControlResult>,
    phase_assignment: &BTreeMap<String, RoadmapPhase>,
    current_pct: f64,
    total_controls: Option<usize>,
) -> MaturityTrajectory {
    let assessed: Vec<(&String, &ControlResult)> = results
        .iter()
        .filter(|(_, r)| {
            matches!(
                r.status,
                ControlStatus::Pass | ControlStatus::Fail | ControlStatus::Partial
            )
        })
        .collect();
    let passing = assessed.iter().filter(|(_, r)| r.status == ControlStatus::Pass).count();
    let denominator = match total_controls {
        Some(total) if total < assessed.len() => {
            warn!(
                total,
                assessed = assessed.len(),
                "total_controls override below assessed count; using assessed count"
            );
            assessed.len()
        }
        Some(total) => total,
        None => assessed.len(),
    };

    let mut resolves_in: BTreeMap<&str, RoadmapPhase> = BTreeMap::new();
    for init in initiatives {
        let phase = init
            .initiative_id
            .as_deref()
            .and_then(|id| phase_assignment.get(id))
            .copied()
            .unwrap_or(RoadmapPhase::Days90);
        for control in &init.controls {
            let failing = results
                .get(control)
                .is_some_and(|r| matches!(r.status, ControlStatus::Fail | ControlStatus::Partial));
            if !failing {
                continue;
            }
            resolves_in
                .entry(control.as_str())
                .and_modify(|p| *p = (*p).min(phase))
                .or_insert(phase);
        }
    }

    let mut resolved = ResolvedByPhase::default();
    for phase in resolves_in.values() {
        match phase {
            RoadmapPhase::Days30 => resolved.days_30 += 1,
            RoadmapPhase::Days60 => resolved.days_60 += 1,
            RoadmapPhase::Days90 => resolved.days_90 += 1,
        }
    }
    resolved.cumulative_90 = resolved.days_30 + resolved.days_60 + resolved.days_90;

    let current = round1(current_pct);
    let [post_30, post_60, post_90] = project(current, passing, denominator, |phase| resolved.in_phase(phase));

    let critical: BTreeSet<&str> = assessed
        .iter()
        .filter(|(_, r)| r.severity == Severity::High)
        .map(|(id, _)| id.as_str())
        .collect();
    let critical_track = if critical.is_empty() {
        CriticalTrack {
            current_percent: 100.0,
            post_30_day_percent: 100.0,
            post_60_day_percent: 100.0,
            post_90_day_percent: 100.0,
            total_critical_controls: 0,
        }
    } else {
        let critical_pass = critical
            .iter()
            .filter(|id| results.get(**id).is_some_and(|r| r.status == ControlStatus::Pass))
            .count();
        let crit_current = round1(critical_pass as f64 / critical.len() as f64 * 100.0);
        let [c30, c60, c90] = project(crit_current, critical_pass, critical.len(), |phase| {
            resolves_in
                .iter()
                .filter(|(id, p)| **p == phase && critical.contains(*id))
                .count()
        });
        CriticalTrack {
            current_percent: crit_current,
            post_30_day_percent: c30,
            post_60_day_percent: c60,
            post_90_day_percent: c90,
            total_critical_controls: critical.len(),
        }
    };

    let mut assumptions = Vec::new();
    if resolved.days_30 > 0 {
        assumptions.push(format!("{} failing control(s) resolved in 30-day phase", resolved.days_30));
    }
    if resolved.days_60 > 0 {
        assumptions.push(format!("{} additional control(s) resolved in 60-day phase", resolved.days_60));
    }
    if resolved.days_90 > 0 {
        assumptions.push(format!("{} additional control(s) resolved in 90-day phase", resolved.days_90));
    }
    assumptions.push(format!(
        "Based on {denominator} assessed controls ({passing} currently passing)"
    ));
    assumptions.push("Assumes all initiative controls resolve to Pass upon implementation".to_string());

    MaturityTrajectory {
        current_percent: current,
        post_30_day_percent: post_30,
        post_60_day_percent: post_60,
        post_90_day_percent: post_90,
        controls_resolved_by_phase: resolved,
        critical_track,
        total_controls: denominator,
        current_passing: passing,
        assumptions,
    }
}

/// Per-phase values; a phase that resolves nothing carries the previous
/// value forward unchanged.
fn project(start: f64, passing: usize, total: usize, resolved_in: impl Fn(RoadmapPhase) -> usize) -> [f64; 3] {
    let mut out = [start; 3];
    let mut previous = start;
    let mut cumulative = 0;
    for (slot, phase) in RoadmapPhase::ALL.into_iter().enumerate() {
        let count = resolved_in(phase);
        cumulative += count;
        if count > 0 && total > 0 {
            previous = round1((passing + cumulative) as f64 / total as f64 * 100.0);
        }
        out[slot] = previous;
    }
    out
}
