//! Evidence-ref gate: every derived object must say where it came from.

use super::types::{AssembledOutput, EvidenceRefs, Grounded};

/// True when every bucket is empty or the bag is absent.
pub fn evidence_is_empty(refs: Option<&EvidenceRefs>) -> bool {
    refs.map_or(true, EvidenceRefs::is_empty)
}

/// Union of several bags, preserving first-seen order per bucket.
/// Blank entries are dropped.
pub fn merge_evidence_refs<'a, I>(sources: I) -> EvidenceRefs
where
    I: IntoIterator<Item = &'a EvidenceRefs>,
{
    let mut merged = EvidenceRefs::default();
    for source in sources {
        for (into, from) in merged.buckets_mut().into_iter().zip(source.buckets()) {
            for value in from {
                if value.trim().is_empty() || into.contains(value) {
                    continue;
                }
                into.push(value.clone());
            }
        }
    }
    merged
}

/// Violations for a single derived object.
pub fn validate_grounded(item: &dyn Grounded) -> Vec<String> {
    let label = item.label();
    let mut violations = Vec::new();
    if evidence_is_empty(item.evidence_refs()) {
        violations.push(format!(
            "{label}: evidence_refs is empty; derived output must cite controls, risks, blockers, signals, or queries"
        ));
    }
    if item.assumptions().is_none() {
        violations.push(format!("{label}: missing 'assumptions' field (use [] if none)"));
    }
    violations
}

/// Walk every derived object in the assembled output.
pub fn validate_evidence_refs(output: &AssembledOutput) -> Vec<String> {
    let mut items: Vec<&dyn Grounded> = Vec::new();
    items.extend(output.initiatives.iter().map(|i| i as &dyn Grounded));
    items.extend(output.decision_impacts.iter().map(|d| d as &dyn Grounded));
    items.extend(output.scaling_impacts.iter().map(|s| s as &dyn Grounded));
    items.extend(output.drift_model.iter().map(|d| d as &dyn Grounded));
    items.extend(output.cost_drivers.iter().map(|c| c as &dyn Grounded));

    items.into_iter().flat_map(validate_grounded).collect()
}
