//! Evidence and relationship guardrail errors.

use super::error_code::{self, PostureErrorCode};

/// Raised when assembled output fails a guardrail; rendering must stop.
#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
    #[error("Relationship integrity failed: {} violation(s)", .0.len())]
    Integrity(Vec<String>),

    #[error("Evidence guardrail failed: {} violation(s)", .0.len())]
    Evidence(Vec<String>),
}

impl GuardrailError {
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Integrity(v) | Self::Evidence(v) => v,
        }
    }
}

impl PostureErrorCode for GuardrailError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Integrity(_) => error_code::INTEGRITY_VIOLATION,
            Self::Evidence(_) => error_code::EVIDENCE_VIOLATION,
        }
    }
}
