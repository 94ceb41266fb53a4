//! Signal provider contract.

use posture_core::errors::SignalError;

use super::types::{EvalScope, SignalResult};

/// Fetches one named signal for a scope.
///
/// Providers do the I/O; the bus handles caching, naming, and timing. A
/// provider may report "not available" as an `Ok` result with that status,
/// and reserve `Err` for real failures. Either way the runtime only ever
/// sees a [`SignalResult`].
pub trait SignalProvider: Send + Sync {
    fn fetch(&self, scope: &EvalScope) -> Result<SignalResult, SignalError>;
}

impl<F> SignalProvider for F
where
    F: Fn(&EvalScope) -> Result<SignalResult, SignalError> + Send + Sync,
{
    fn fetch(&self, scope: &EvalScope) -> Result<SignalResult, SignalError> {
        self(scope)
    }
}

/// Wraps a provider that needs at least one subscription in scope.
pub struct RequiresSubscriptions<P> {
    inner: P,
}

impl<P: SignalProvider> RequiresSubscriptions<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: SignalProvider> SignalProvider for RequiresSubscriptions<P> {
    fn fetch(&self, scope: &EvalScope) -> Result<SignalResult, SignalError> {
        if scope.subscription_ids.is_empty() {
            return Ok(SignalResult::not_available("No subscriptions in scope"));
        }
        self.inner.fetch(scope)
    }
}
