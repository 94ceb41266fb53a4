//! Control pack loading errors.

use super::error_code::{self, PostureErrorCode};
use super::{GraphError, TaxonomyError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Control pack not found: {path}")]
    PackNotFound { path: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error(
        "Control pack '{pack}' is version-locked (expected checksum {expected}, got {actual}); \
         bump the pack version instead of editing a frozen catalog"
    )]
    VersionLocked {
        pack: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PostureErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::VersionLocked { .. } => error_code::CATALOG_VERSION_LOCKED,
            Self::Taxonomy(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            _ => error_code::CATALOG_ERROR,
        }
    }
}
