//! Error handling for Posture.
//! One error enum per subsystem, `thiserror` only.

pub mod catalog_error;
pub mod config_error;
pub mod error_code;
pub mod evaluator_error;
pub mod graph_error;
pub mod guardrail_error;
pub mod runtime_error;
pub mod signal_error;
pub mod taxonomy_error;

pub use catalog_error::CatalogError;
pub use config_error::ConfigError;
pub use error_code::PostureErrorCode;
pub use evaluator_error::EvaluatorError;
pub use graph_error::GraphError;
pub use guardrail_error::GuardrailError;
pub use runtime_error::RuntimeError;
pub use signal_error::SignalError;
pub use taxonomy_error::{TaxonomyError, TaxonomyViolation};
