//! Runtime errors. Aggregates subsystem errors via `From` conversions.

use super::error_code::PostureErrorCode;
use super::{CatalogError, ConfigError, GraphError};

/// Fatal errors surfaced while loading or starting an assessment run.
///
/// Signal and evaluator failures never appear here: they are recorded as
/// control statuses and the run continues. Taxonomy violations arrive
/// wrapped in `Catalog`, since only pack loading validates a catalog.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl PostureErrorCode for RuntimeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Catalog(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
        }
    }
}
