//! Control graph errors.

use super::error_code::{self, PostureErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown intent: '{intent}'. Available: {}", .available.join(", "))]
    UnknownIntent {
        intent: String,
        available: Vec<String>,
    },

    #[error("Unknown control: '{0}'")]
    UnknownControl(String),

    #[error("Dependency cycle among controls: {}", .members.join(" -> "))]
    CycleDetected { members: Vec<String> },

    #[error("Invalid graph definition: {0}")]
    InvalidDefinition(String),
}

impl PostureErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownIntent { .. } => error_code::UNKNOWN_INTENT,
            Self::UnknownControl(_) => error_code::UNKNOWN_CONTROL,
            Self::CycleDetected { .. } => error_code::GRAPH_CYCLE,
            Self::InvalidDefinition(_) => error_code::GRAPH_ERROR,
        }
    }
}
