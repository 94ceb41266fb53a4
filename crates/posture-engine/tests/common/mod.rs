//! Shared fixtures for integration tests: the alz-v1 pack, a bus with a
//! provider for every fixture signal, and table-driven evaluators.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use posture_core::config::SignalConfig;
use posture_core::errors::{EvaluatorError, SignalError};
use posture_engine::runtime::{ControlResult, EvalContext, EvaluatorRegistry};
use posture_engine::signals::{EvalScope, SignalBus, SignalMap, SignalResult};
use posture_engine::taxonomy::{ControlStatus, EvaluationMode};
use posture_engine::ControlPack;
use serde_json::json;

pub const FIXTURE_SIGNALS: &[&str] = &[
    "arm:mg_hierarchy",
    "policy:assignments",
    "policy:compliance_summary",
    "resource_graph:azure_firewall",
    "defender:pricings",
];

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-fixtures/catalog/alz-v1")
}

pub fn load_pack() -> ControlPack {
    ControlPack::load(fixture_dir()).expect("fixture pack loads")
}

pub fn scope() -> EvalScope {
    EvalScope::tenant("contoso").with_subscriptions(["sub-a", "sub-b"])
}

/// Counts provider invocations per signal.
#[derive(Default)]
pub struct CallCounter {
    calls: std::sync::Mutex<BTreeMap<String, usize>>,
    total: AtomicUsize,
}

impl CallCounter {
    pub fn record(&self, signal: &str) {
        self.total.fetch_add(1, Ordering::SeqCst);
        let mut calls = self.calls.lock().expect("counter lock");
        *calls.entry(signal.to_string()).or_default() += 1;
    }

    pub fn calls(&self, signal: &str) -> usize {
        self.calls.lock().expect("counter lock").get(signal).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// A bus where every fixture signal returns OK, except `failing`, whose
/// provider returns an error.
pub fn bus_with(failing: &[&str], counter: Arc<CallCounter>) -> SignalBus {
    let mut bus = SignalBus::from_config(&SignalConfig::default());
    for &signal in FIXTURE_SIGNALS {
        let counter = Arc::clone(&counter);
        let fails = failing.contains(&signal);
        bus.register(signal, move |scope: &EvalScope| -> Result<SignalResult, SignalError> {
            counter.record(signal);
            if fails {
                return Err(SignalError::ProviderFailed {
                    signal: signal.to_string(),
                    message: "403 Forbidden".to_string(),
                });
            }
            Ok(SignalResult::ok_raw(json!({
                "tenant": scope.tenant_id,
                "subscriptions": scope.subscription_ids.len(),
            })))
        });
    }
    bus
}

pub fn healthy_bus() -> SignalBus {
    bus_with(&[], Arc::new(CallCounter::default()))
}

/// One evaluator per automated fixture control. Controls listed in
/// `verdicts` return that status; the rest pass.
pub fn evaluators(pack: &ControlPack, verdicts: &[(&str, ControlStatus)]) -> EvaluatorRegistry {
    let verdicts: BTreeMap<String, ControlStatus> =
        verdicts.iter().map(|(id, s)| (id.to_string(), *s)).collect();
    let mut registry = EvaluatorRegistry::new();
    for def in pack.catalog().iter() {
        if def.evaluation_mode() == EvaluationMode::Manual {
            continue;
        }
        let status = verdicts.get(def.control_id()).copied().unwrap_or(ControlStatus::Pass);
        registry.register(
            def.full_id(),
            move |ctx: &EvalContext, signals: &SignalMap| -> Result<ControlResult, EvaluatorError> {
                Ok(ControlResult::new(status)
                    .with_reason(format!("{} saw {} signal(s)", ctx.control_id, signals.len())))
            },
        );
    }
    registry
}
