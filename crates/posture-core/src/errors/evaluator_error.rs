//! Evaluator errors.

use super::error_code::{self, PostureErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("No evaluator registered for {0}")]
    NotRegistered(String),

    #[error("Required signal {signal} missing from bundle")]
    MissingSignal { signal: String },

    #[error("Malformed signal payload for {signal}: {message}")]
    MalformedPayload { signal: String, message: String },

    #[error("Evaluator panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

impl PostureErrorCode for EvaluatorError {
    fn error_code(&self) -> &'static str {
        error_code::EVALUATION_ERROR
    }
}
