//! Signal result and evaluation scope types.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalStatus {
    #[serde(rename = "OK")]
    Ok,
    NotAvailable,
    Error,
}

impl SignalStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotAvailable => "NotAvailable",
            Self::Error => "Error",
        }
    }
}

/// Unified result from any signal provider. Shared read-only once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal_name: String,
    pub status: SignalStatus,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub raw: Option<Value>,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub duration_ms: u64,
}

impl SignalResult {
    pub fn ok(items: Vec<Value>) -> Self {
        Self {
            signal_name: String::new(),
            status: SignalStatus::Ok,
            items,
            raw: None,
            error_msg: String::new(),
            duration_ms: 0,
        }
    }

    /// OK result carrying a single summarised payload.
    pub fn ok_raw(raw: Value) -> Self {
        Self {
            raw: Some(raw),
            ..Self::ok(Vec::new())
        }
    }

    pub fn not_available(message: impl Into<String>) -> Self {
        Self {
            status: SignalStatus::NotAvailable,
            error_msg: message.into(),
            ..Self::ok(Vec::new())
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SignalStatus::Error,
            error_msg: message.into(),
            ..Self::ok(Vec::new())
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == SignalStatus::Ok
    }

    /// The payload evaluators should read: `raw` if present, else the first item.
    pub fn payload(&self) -> Option<&Value> {
        self.raw.as_ref().or_else(|| self.items.first())
    }
}

/// Signals handed to an evaluator, keyed by name.
pub type SignalMap = BTreeMap<String, Arc<SignalResult>>;

/// What part of the tenant an evaluation targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalScope {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub management_group_id: Option<String>,
    #[serde(default)]
    pub subscription_ids: Vec<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
}

impl EvalScope {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Self::default()
        }
    }

    pub fn with_subscriptions<I, S>(mut self, subscriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscription_ids = subscriptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_management_group(mut self, mg: impl Into<String>) -> Self {
        self.management_group_id = Some(mg.into());
        self
    }

    pub fn with_resource_group(mut self, rg: impl Into<String>) -> Self {
        self.resource_group = Some(rg.into());
        self
    }

    /// Deterministic 16-hex-digit hash of the identifying fields.
    ///
    /// Subscription order does not matter: the list is sorted before
    /// hashing, and object keys serialise in sorted order.
    pub fn scope_hash(&self) -> String {
        let mut subs = self.subscription_ids.clone();
        subs.sort();
        let canonical = serde_json::json!({
            "tenant_id": self.tenant_id,
            "mg_id": self.management_group_id,
            "subs": subs,
            "rg": self.resource_group,
        });
        format!("{:016x}", xxh3_64(canonical.to_string().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_hash_ignores_subscription_order() {
        let a = EvalScope::tenant("t1").with_subscriptions(["sub-b", "sub-a"]);
        let b = EvalScope::tenant("t1").with_subscriptions(["sub-a", "sub-b"]);
        assert_eq!(a.scope_hash(), b.scope_hash());
        assert_eq!(a.scope_hash().len(), 16);
    }

    #[test]
    fn scope_hash_separates_scopes() {
        let base = EvalScope::tenant("t1").with_subscriptions(["sub-a"]);
        let rg = base.clone().with_resource_group("rg-core");
        let other_tenant = EvalScope::tenant("t2").with_subscriptions(["sub-a"]);
        assert_ne!(base.scope_hash(), rg.scope_hash());
        assert_ne!(base.scope_hash(), other_tenant.scope_hash());
    }

    #[test]
    fn payload_prefers_raw() {
        let r = SignalResult::ok(vec![serde_json::json!({"a": 1})]);
        assert_eq!(r.payload().unwrap()["a"], 1);
        let r = SignalResult::ok_raw(serde_json::json!({"total": 4}));
        assert_eq!(r.payload().unwrap()["total"], 4);
        assert!(SignalResult::error("boom").payload().is_none());
    }

    #[test]
    fn status_serialises_with_wire_names() {
        assert_eq!(serde_json::to_string(&SignalStatus::Ok).unwrap(), "\"OK\"");
        assert_eq!(SignalStatus::NotAvailable.name(), "NotAvailable");
    }
}
