//! Signal availability matrix: which signals are reachable for a scope.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::bus::SignalBus;
use super::types::{EvalScope, SignalStatus};

const ERROR_MESSAGE_LIMIT: usize = 60;

/// Outcome of probing one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum Availability {
    Ok,
    Unavailable,
    /// Provider error, message truncated.
    Error(String),
    /// Not registered on the bus; never fetched.
    Unregistered,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Error(msg) if msg.is_empty() => f.write_str("error"),
            Self::Error(msg) => write!(f, "error: {msg}"),
            Self::Unregistered => f.write_str("unregistered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityEntry {
    pub signal: String,
    pub availability: Availability,
    pub duration_ms: u64,
}

/// Probe results grouped by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityMatrix {
    pub sources: BTreeMap<String, Vec<AvailabilityEntry>>,
}

impl AvailabilityMatrix {
    /// `(available, total)` for one source.
    pub fn source_totals(&self, source: &str) -> (usize, usize) {
        self.sources.get(source).map_or((0, 0), |entries| {
            let ok = entries
                .iter()
                .filter(|e| e.availability == Availability::Ok)
                .count();
            (ok, entries.len())
        })
    }

    /// `(available, total)` across every source.
    pub fn totals(&self) -> (usize, usize) {
        self.sources.keys().fold((0, 0), |(ok, total), source| {
            let (o, t) = self.source_totals(source);
            (ok + o, total + t)
        })
    }
}

/// Fetch every listed signal once and record whether it came back usable.
///
/// Results go through the bus cache, so a probe also warms it for the
/// assessment that usually follows.
pub fn probe_signal_availability(
    bus: &SignalBus,
    scope: &EvalScope,
    sources: &BTreeMap<String, Vec<String>>,
) -> AvailabilityMatrix {
    let mut matrix = AvailabilityMatrix::default();
    for (source, names) in sources {
        let entries = names
            .iter()
            .map(|name| {
                if !bus.is_registered(name) {
                    return AvailabilityEntry {
                        signal: name.clone(),
                        availability: Availability::Unregistered,
                        duration_ms: 0,
                    };
                }
                let result = bus.fetch(name, scope);
                let availability = match result.status {
                    SignalStatus::Ok => Availability::Ok,
                    SignalStatus::NotAvailable => Availability::Unavailable,
                    SignalStatus::Error => Availability::Error(
                        result.error_msg.chars().take(ERROR_MESSAGE_LIMIT).collect(),
                    ),
                };
                AvailabilityEntry {
                    signal: name.clone(),
                    availability,
                    duration_ms: result.duration_ms,
                }
            })
            .collect();
        matrix.sources.insert(source.clone(), entries);
    }
    matrix
}

/// Built-in grouping of the standard signal names by backing service.
pub fn default_signal_sources() -> BTreeMap<String, Vec<String>> {
    let groups: [(&str, &[&str]); 6] = [
        (
            "Resource Graph",
            &[
                "resource_graph:azure_firewall",
                "resource_graph:vnets",
                "resource_graph:public_ips",
                "resource_graph:route_tables",
                "resource_graph:nsgs",
                "resource_graph:storage_posture",
                "resource_graph:keyvault_posture",
                "resource_graph:sql_posture",
                "resource_graph:app_service_posture",
                "resource_graph:acr_posture",
                "resource_graph:aks_posture",
                "resource_graph:private_endpoints",
                "resource_graph:nsg_coverage",
                "resource_graph:resource_locks",
                "resource_graph:backup_coverage",
            ],
        ),
        ("ARM / Management", &["arm:mg_hierarchy"]),
        ("Policy", &["policy:assignments", "policy:compliance_summary"]),
        ("Defender", &["defender:pricings", "defender:secure_score"]),
        ("Monitoring", &["monitor:diag_coverage_sample"]),
        ("Identity", &["identity:rbac_hygiene"]),
    ];
    groups
        .iter()
        .map(|(source, names)| {
            (
                (*source).to_string(),
                names.iter().map(|n| (*n).to_string()).collect(),
            )
        })
        .collect()
}
