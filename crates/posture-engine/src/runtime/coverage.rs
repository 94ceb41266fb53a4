//! Automation coverage: how much of a run was decided by automation.

use serde::Serialize;

use crate::graph::StatusView;
use crate::taxonomy::ControlStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutomationCoverage {
    pub total_controls: usize,
    /// Pass, Fail, or Partial.
    pub automated_controls: usize,
    pub manual_controls: usize,
    pub not_applicable_controls: usize,
    pub not_verified_controls: usize,
    pub signal_error_controls: usize,
    pub evaluation_error_controls: usize,
    /// Automated share of `total_controls`, one decimal.
    pub automation_percent: f64,
    /// Share of attempted automation that ran cleanly, four decimals.
    /// 1.0 when nothing was attempted.
    pub automation_integrity: f64,
}

/// Tally results against a denominator of `total_controls`.
pub fn automation_coverage(results: &impl StatusView, total_controls: usize) -> AutomationCoverage {
    let mut coverage = AutomationCoverage {
        total_controls,
        ..AutomationCoverage::default()
    };
    results.for_each_status(&mut |_, status| match status {
        ControlStatus::Pass | ControlStatus::Fail | ControlStatus::Partial => {
            coverage.automated_controls += 1
        }
        ControlStatus::Manual => coverage.manual_controls += 1,
        ControlStatus::NotApplicable => coverage.not_applicable_controls += 1,
        ControlStatus::NotVerified => coverage.not_verified_controls += 1,
        ControlStatus::SignalError => coverage.signal_error_controls += 1,
        ControlStatus::EvaluationError => coverage.evaluation_error_controls += 1,
        ControlStatus::Deferred => {}
    });

    if total_controls > 0 {
        let pct = coverage.automated_controls as f64 / total_controls as f64 * 100.0;
        coverage.automation_percent = (pct * 10.0).round() / 10.0;
    }

    let errors = coverage.signal_error_controls + coverage.evaluation_error_controls;
    let attempted = coverage.automated_controls + errors;
    coverage.automation_integrity = if attempted == 0 {
        1.0
    } else {
        let clean = 1.0 - errors as f64 / attempted as f64;
        (clean * 10_000.0).round() / 10_000.0
    };
    coverage
}
