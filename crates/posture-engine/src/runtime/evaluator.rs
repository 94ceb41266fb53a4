//! Evaluator contract and the registry that dispatches to evaluators.

use std::sync::Arc;

use posture_core::errors::EvaluatorError;
use posture_core::types::collections::FxHashMap;
use serde_json::Value;

use super::types::{ControlResult, EvalContext};
use crate::signals::{SignalMap, SignalStatus};

/// Pure control logic: signals in, verdict out.
///
/// Evaluators must not perform I/O. Everything they read arrives in the
/// signal map, already fetched and cached by the bus.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, ctx: &EvalContext, signals: &SignalMap) -> Result<ControlResult, EvaluatorError>;
}

impl<F> Evaluator for F
where
    F: Fn(&EvalContext, &SignalMap) -> Result<ControlResult, EvaluatorError> + Send + Sync,
{
    fn evaluate(&self, ctx: &EvalContext, signals: &SignalMap) -> Result<ControlResult, EvaluatorError> {
        self(ctx, signals)
    }
}

/// Evaluators keyed by long-form control id.
#[derive(Default, Clone)]
pub struct EvaluatorRegistry {
    evaluators: FxHashMap<String, Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E>(&mut self, full_id: impl Into<String>, evaluator: E)
    where
        E: Evaluator + 'static,
    {
        self.evaluators.insert(full_id.into(), Arc::new(evaluator));
    }

    pub fn get(&self, full_id: &str) -> Option<&Arc<dyn Evaluator>> {
        self.evaluators.get(full_id)
    }

    pub fn contains(&self, full_id: &str) -> bool {
        self.evaluators.contains_key(full_id)
    }

    /// Registered long-form ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.evaluators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("evaluators", &self.ids())
            .finish()
    }
}

/// Payload of a required signal, or the error an evaluator should return.
///
/// Evaluators use this instead of indexing the map so a missing or
/// payload-less signal becomes a typed error rather than a panic.
pub fn require_payload<'a>(signals: &'a SignalMap, name: &str) -> Result<&'a Value, EvaluatorError> {
    let result = signals.get(name).ok_or_else(|| EvaluatorError::MissingSignal {
        signal: name.to_string(),
    })?;
    if result.status != SignalStatus::Ok {
        return Err(EvaluatorError::MalformedPayload {
            signal: name.to_string(),
            message: format!("status {}", result.status.name()),
        });
    }
    result.payload().ok_or_else(|| EvaluatorError::MalformedPayload {
        signal: name.to_string(),
        message: "empty payload".to_string(),
    })
}
