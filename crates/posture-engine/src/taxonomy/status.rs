//! Control statuses and their scoring categories.
//!
//! Each status belongs to exactly one of the maturity / non-maturity
//! categories. Scoring code asks the status which bucket it is in instead
//! of keeping its own sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of a single control in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlStatus {
    /// Control fully satisfied.
    Pass,
    /// Control violated.
    Fail,
    /// Evidence of both pass and fail.
    Partial,
    /// Needs human verification.
    Manual,
    /// Does not apply to this environment.
    NotApplicable,
    /// Automation exists but could not run, e.g. missing permissions.
    NotVerified,
    /// A required signal failed to fetch.
    SignalError,
    /// The evaluator failed or panicked.
    EvaluationError,
    /// Skipped because a parent control failed. Synthesised by the runtime.
    Deferred,
}

impl ControlStatus {
    pub const ALL: &'static [ControlStatus] = &[
        Self::Pass,
        Self::Fail,
        Self::Partial,
        Self::Manual,
        Self::NotApplicable,
        Self::NotVerified,
        Self::SignalError,
        Self::EvaluationError,
        Self::Deferred,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Partial => "Partial",
            Self::Manual => "Manual",
            Self::NotApplicable => "NotApplicable",
            Self::NotVerified => "NotVerified",
            Self::SignalError => "SignalError",
            Self::EvaluationError => "EvaluationError",
            Self::Deferred => "Deferred",
        }
    }

    /// Counts toward maturity and discipline math.
    pub fn is_maturity(&self) -> bool {
        matches!(self, Self::Pass | Self::Fail | Self::Partial)
    }

    /// Produced by automation that ran to completion.
    pub fn is_automated(&self) -> bool {
        self.is_maturity()
    }

    /// Signal or evaluator failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SignalError | Self::EvaluationError)
    }

    /// Belongs in risk tables.
    pub fn is_risk(&self) -> bool {
        matches!(
            self,
            Self::Fail | Self::Partial | Self::SignalError | Self::EvaluationError
        )
    }

    /// A parent in this state defers children that opted in.
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Fail | Self::SignalError | Self::EvaluationError)
    }

    /// Credit earned toward a discipline score. `None` for statuses outside
    /// the maturity set; they still weigh in, at zero credit.
    pub fn score_credit(&self) -> Option<f64> {
        match self {
            Self::Pass => Some(1.0),
            Self::Partial => Some(0.5),
            Self::Fail => Some(0.0),
            _ => None,
        }
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.name() == s)
            .ok_or_else(|| format!("unknown control status '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_is_exactly_maturity_or_not() {
        let maturity: Vec<_> = ControlStatus::ALL.iter().filter(|s| s.is_maturity()).collect();
        assert_eq!(
            maturity,
            vec![&ControlStatus::Pass, &ControlStatus::Fail, &ControlStatus::Partial]
        );
        for status in ControlStatus::ALL {
            assert_eq!(status.is_maturity(), status.score_credit().is_some(), "{status}");
        }
    }

    #[test]
    fn error_statuses_are_risk_but_not_maturity() {
        for status in ControlStatus::ALL.iter().filter(|s| s.is_error()) {
            assert!(status.is_risk());
            assert!(!status.is_maturity());
            assert!(status.blocks_dependents());
        }
    }

    #[test]
    fn deferred_does_not_propagate() {
        assert!(!ControlStatus::Deferred.blocks_dependents());
        assert!(!ControlStatus::Deferred.is_maturity());
        assert!(!ControlStatus::Partial.blocks_dependents());
    }

    #[test]
    fn names_round_trip() {
        for status in ControlStatus::ALL {
            assert_eq!(status.name().parse::<ControlStatus>().unwrap(), *status);
        }
        assert!("Unknown".parse::<ControlStatus>().is_err());
    }
}
