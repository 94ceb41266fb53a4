//! Signal provider errors.
//!
//! Providers may fail; the bus folds those failures into an `Error`
//! signal result rather than propagating them to the runtime.

use super::error_code::{self, PostureErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Provider for {signal} failed: {message}")]
    ProviderFailed { signal: String, message: String },
}

impl PostureErrorCode for SignalError {
    fn error_code(&self) -> &'static str {
        error_code::SIGNAL_ERROR
    }
}
