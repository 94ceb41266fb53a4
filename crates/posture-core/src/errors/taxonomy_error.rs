//! Taxonomy validation errors.
//!
//! Validation is exhaustive: every violation in a catalog is collected
//! before the error is raised, so one load reports every problem.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error_code::{self, PostureErrorCode};

/// A single structural problem found in a control catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyViolation {
    /// Short id of the offending control, `design_areas.<area>` for index
    /// entries, or `*` for catalog-wide problems.
    pub control_id: String,
    pub field: String,
    pub detail: String,
}

impl TaxonomyViolation {
    pub fn new(
        control_id: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            control_id: control_id.into(),
            field: field.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TaxonomyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.control_id, self.field, self.detail)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("{} taxonomy violation(s), fix before assessing:\n{}", .0.len(), format_violations(.0))]
    Violations(Vec<TaxonomyViolation>),
}

impl TaxonomyError {
    pub fn violations(&self) -> &[TaxonomyViolation] {
        match self {
            Self::Violations(v) => v,
        }
    }
}

fn format_violations(violations: &[TaxonomyViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  x {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PostureErrorCode for TaxonomyError {
    fn error_code(&self) -> &'static str {
        error_code::TAXONOMY_VIOLATION
    }
}
