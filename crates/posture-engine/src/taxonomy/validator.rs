//! Fail-fast taxonomy enforcement.
//!
//! Validation runs over the whole catalog and collects every violation.
//! Only a completely clean catalog is turned into [`ControlDefinition`]s;
//! there is no fallback for a missing or unknown field.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use posture_core::errors::{TaxonomyError, TaxonomyViolation};
use posture_core::types::collections::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::control::{ControlCatalog, ControlDefinition, ControlFields};
use super::vocabulary::{ControlType, DesignArea, EvaluationMode, Severity, WafPillar};

/// Fields every control record must carry.
pub const REQUIRED_CONTROL_FIELDS: &[&str] = &[
    "name",
    "full_id",
    "design_area",
    "sub_area",
    "waf_pillar",
    "control_type",
    "severity",
    "evaluation_logic",
    "evaluator_module",
    "required_signals",
];

/// `controls.json` as authored. Control records stay untyped until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCatalog {
    #[serde(default)]
    pub design_areas: BTreeMap<String, RawDesignArea>,
    #[serde(default)]
    pub controls: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDesignArea {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub controls: Vec<String>,
}

/// Validate a single raw control record. Empty means valid.
pub fn validate_control(control_id: &str, raw: &Value) -> Vec<TaxonomyViolation> {
    match extract_fields(control_id, raw) {
        Ok(_) => Vec::new(),
        Err(violations) => violations,
    }
}

/// Cross-check the design-area index against the control records.
pub fn validate_design_area_index(
    controls: &BTreeMap<String, Value>,
    index: &BTreeMap<String, RawDesignArea>,
) -> Vec<TaxonomyViolation> {
    let mut violations = Vec::new();
    let mut indexed_under: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (area_name, area) in index {
        if DesignArea::from_str(area_name).is_err() {
            violations.push(TaxonomyViolation::new(
                format!("design_areas.{area_name}"),
                "design_area",
                format!("'{area_name}' is not a valid design area"),
            ));
        }
        for cid in &area.controls {
            indexed_under.entry(cid.as_str()).or_default().push(area_name.as_str());
        }
    }

    for (cid, areas) in &indexed_under {
        if !controls.contains_key(*cid) {
            violations.push(TaxonomyViolation::new(
                *cid,
                "design_areas",
                "Listed in design_areas index but not defined in controls",
            ));
        } else if areas.len() > 1 {
            violations.push(TaxonomyViolation::new(
                *cid,
                "design_areas",
                format!("Listed under more than one design area: {}", areas.join(", ")),
            ));
        }
    }

    for (cid, raw) in controls {
        let Some(areas) = indexed_under.get(cid.as_str()) else {
            violations.push(TaxonomyViolation::new(
                cid.as_str(),
                "design_areas",
                "Defined in controls but not listed in any design_area index",
            ));
            continue;
        };
        if let Some(declared) = raw.get("design_area").and_then(Value::as_str) {
            if let Some(other) = areas.iter().find(|a| **a != declared) {
                violations.push(TaxonomyViolation::new(
                    cid.as_str(),
                    "design_areas",
                    format!("Indexed under '{other}' but declares design_area '{declared}'"),
                ));
            }
        }
    }

    violations
}

/// Validate the whole catalog, then construct frozen definitions.
///
/// Returns every violation found across both passes, or a catalog. An
/// empty catalog is itself a violation.
pub fn validate_and_build(raw: &RawCatalog) -> Result<ControlCatalog, TaxonomyError> {
    if raw.controls.is_empty() {
        return Err(TaxonomyError::Violations(vec![TaxonomyViolation::new(
            "*",
            "controls",
            "Control pack has zero controls, nothing to assess",
        )]));
    }

    let mut violations = Vec::new();
    let mut validated = Vec::with_capacity(raw.controls.len());

    // Pass 1: per-control fields
    for (cid, record) in &raw.controls {
        match extract_fields(cid, record) {
            Ok(fields) => validated.push(fields),
            Err(mut found) => violations.append(&mut found),
        }
    }

    violations.extend(duplicate_full_ids(&validated));

    // Pass 2: design-area index. An absent index is derived from the records.
    if !raw.design_areas.is_empty() {
        violations.extend(validate_design_area_index(&raw.controls, &raw.design_areas));
    }

    if !violations.is_empty() {
        warn!(count = violations.len(), "catalog rejected by taxonomy validation");
        return Err(TaxonomyError::Violations(violations));
    }

    // Pass 3: construct. Nothing above this line creates a definition.
    let controls: BTreeMap<String, Arc<ControlDefinition>> = validated
        .into_iter()
        .map(|fields| {
            let def = ControlDefinition::from_fields(fields);
            (def.control_id().to_string(), Arc::new(def))
        })
        .collect();

    let areas = area_index(raw, &controls);
    debug!(controls = controls.len(), areas = areas.len(), "catalog validated");
    Ok(ControlCatalog::new(controls, areas))
}

/// Long-form ids must be unique: both the catalog and the graph resolve
/// them back to a single short id. The first control in id order keeps
/// the id; every later claimant is a violation.
fn duplicate_full_ids(validated: &[ControlFields]) -> Vec<TaxonomyViolation> {
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    let mut violations = Vec::new();
    for fields in validated {
        match owners.get(fields.full_id.as_str()) {
            Some(owner) => violations.push(TaxonomyViolation::new(
                &fields.control_id,
                "full_id",
                format!("'{}' is already the full_id of {owner}", fields.full_id),
            )),
            None => {
                owners.insert(fields.full_id.as_str(), fields.control_id.as_str());
            }
        }
    }
    violations
}

/// Convenience wrapper for an already-parsed `controls.json` value.
pub fn validate_and_build_value(value: Value) -> Result<ControlCatalog, TaxonomyError> {
    let raw: RawCatalog = serde_json::from_value(value).map_err(|e| {
        TaxonomyError::Violations(vec![TaxonomyViolation::new(
            "*",
            "controls",
            format!("Catalog is not a valid control document: {e}"),
        )])
    })?;
    validate_and_build(&raw)
}

fn area_index(
    raw: &RawCatalog,
    controls: &BTreeMap<String, Arc<ControlDefinition>>,
) -> BTreeMap<DesignArea, Vec<String>> {
    let mut areas: BTreeMap<DesignArea, Vec<String>> = BTreeMap::new();
    if raw.design_areas.is_empty() {
        for def in controls.values() {
            areas
                .entry(def.design_area())
                .or_default()
                .push(def.control_id().to_string());
        }
        return areas;
    }
    for (name, area) in &raw.design_areas {
        if let Ok(parsed) = DesignArea::from_str(name) {
            areas.insert(parsed, area.controls.clone());
        }
    }
    areas
}

/// Validate one record and pull out typed fields in the same pass.
fn extract_fields(control_id: &str, raw: &Value) -> Result<ControlFields, Vec<TaxonomyViolation>> {
    let mut violations = Vec::new();
    let mut fail = |field: &str, detail: String| {
        violations.push(TaxonomyViolation::new(control_id, field, detail));
    };

    let Some(record) = raw.as_object() else {
        return Err(vec![TaxonomyViolation::new(
            control_id,
            "*",
            "Control entry must be a JSON object",
        )]);
    };

    // 1. Presence of every required field
    let mut text: FxHashMap<&str, &str> = FxHashMap::default();
    for &field in REQUIRED_CONTROL_FIELDS {
        match record.get(field) {
            None | Some(Value::Null) => fail(field, "Missing or empty required field".to_string()),
            Some(Value::String(s)) if s.trim().is_empty() => {
                fail(field, "Missing or empty required field".to_string())
            }
            Some(Value::String(s)) => {
                text.insert(field, s.as_str());
            }
            Some(_) if field == "required_signals" => {}
            Some(other) => fail(field, format!("Expected a string, found {}", json_kind(other))),
        }
    }

    // 2. Closed vocabularies
    let design_area = parse_enum::<DesignArea>(&text, "design_area", &mut fail);
    let waf_pillar = parse_enum::<WafPillar>(&text, "waf_pillar", &mut fail);
    let control_type = parse_enum::<ControlType>(&text, "control_type", &mut fail);
    let severity = parse_enum::<Severity>(&text, "severity", &mut fail);
    let evaluation_mode = parse_enum::<EvaluationMode>(&text, "evaluation_logic", &mut fail);

    // 3. Every design area has a section: `DesignArea::section` is total,
    //    so a parsed area is always mappable.

    // 4. required_signals is a non-empty list of names
    let mut required_signals = Vec::new();
    match record.get("required_signals") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) if items.is_empty() => fail(
            "required_signals",
            "Must be a non-empty list of signal names".to_string(),
        ),
        Some(Value::Array(items)) => {
            for item in items {
                match item.as_str() {
                    Some(name) if !name.trim().is_empty() => required_signals.push(name.to_string()),
                    _ => fail(
                        "required_signals",
                        format!("Signal names must be non-empty strings, found {item}"),
                    ),
                }
            }
        }
        Some(_) => fail(
            "required_signals",
            "Must be a non-empty list of signal names".to_string(),
        ),
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    match (design_area, waf_pillar, control_type, severity, evaluation_mode) {
        (Some(design_area), Some(waf_pillar), Some(control_type), Some(severity), Some(evaluation_mode)) => {
            let field = |name: &str| text.get(name).map(|s| s.to_string()).unwrap_or_default();
            let optional = |name: &str| {
                record
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            Ok(ControlFields {
                control_id: control_id.to_string(),
                full_id: field("full_id"),
                title: field("name"),
                design_area,
                sub_area: field("sub_area"),
                waf_pillar,
                control_type,
                severity,
                evaluation_mode,
                evaluator_module: field("evaluator_module"),
                required_signals,
                caf_guidance: optional("caf_guidance").unwrap_or_default(),
                caf_url: optional("caf_url").unwrap_or_default(),
                signal_category: optional("signal_category"),
            })
        }
        // Unreachable once the violation list is empty.
        _ => Err(vec![TaxonomyViolation::new(
            control_id,
            "*",
            "Enumerated fields could not be resolved",
        )]),
    }
}

fn parse_enum<T: FromStr<Err = String>>(
    text: &FxHashMap<&str, &str>,
    field: &str,
    fail: &mut impl FnMut(&str, String),
) -> Option<T> {
    let value = text.get(field)?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(detail) => {
            fail(field, detail);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn control(area: &str) -> Value {
        json!({
            "name": "Management group hierarchy depth",
            "full_id": "2df27ee4-12e7-4f98-9f63-04722dd69c5b",
            "design_area": area,
            "sub_area": "Management Groups",
            "waf_pillar": "Operational Excellence",
            "control_type": "ALZ",
            "severity": "Medium",
            "evaluation_logic": "automated",
            "evaluator_module": "governance.mg_depth",
            "required_signals": ["arm:mg_hierarchy"],
        })
    }

    fn catalog(controls: Vec<(&str, Value)>, index: Vec<(&str, Vec<&str>)>) -> RawCatalog {
        RawCatalog {
            controls: controls
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            design_areas: index
                .into_iter()
                .map(|(k, ids)| {
                    (
                        k.to_string(),
                        RawDesignArea {
                            name: None,
                            controls: ids.into_iter().map(str::to_string).collect(),
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn valid_control_has_no_violations() {
        assert!(validate_control("2df27ee4", &control("governance")).is_empty());
    }

    #[test]
    fn builds_typed_definition_with_computed_fields() {
        let raw = catalog(
            vec![("2df27ee4", control("governance"))],
            vec![("governance", vec!["2df27ee4"])],
        );
        let built = validate_and_build(&raw).unwrap();
        let def = built.get("2df27ee4").unwrap();
        assert_eq!(def.design_area(), DesignArea::Governance);
        assert_eq!(def.section().name(), "Governance");
        assert_eq!(def.weight(), 1.3);
        assert_eq!(def.required_signals(), ["arm:mg_hierarchy".to_string()]);
        assert_eq!(built.controls_in_area(DesignArea::Governance), ["2df27ee4".to_string()]);
    }

    #[test]
    fn blank_and_missing_fields_are_reported() {
        let mut raw = control("governance");
        raw["sub_area"] = json!("   ");
        raw.as_object_mut().unwrap().remove("evaluator_module");
        let violations = validate_control("x", &raw);
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["sub_area", "evaluator_module"]);
    }

    #[test]
    fn unknown_vocabulary_values_are_reported() {
        let mut raw = control("networking");
        raw["severity"] = json!("Critical");
        let violations = validate_control("x", &raw);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.field == "design_area"));
        assert!(violations.iter().any(|v| v.field == "severity" && v.detail.contains("Critical")));
    }

    #[test]
    fn required_signals_must_be_non_empty_list() {
        let mut raw = control("governance");
        raw["required_signals"] = json!([]);
        assert_eq!(validate_control("x", &raw)[0].field, "required_signals");

        raw["required_signals"] = json!("arm:mg_hierarchy");
        assert_eq!(validate_control("x", &raw)[0].field, "required_signals");

        raw["required_signals"] = json!(["ok", ""]);
        assert_eq!(validate_control("x", &raw).len(), 1);
    }

    #[test]
    fn one_bad_control_builds_nothing() {
        let mut bad = control("governance");
        bad["waf_pillar"] = json!("Speed");
        let raw = catalog(
            vec![("good0001", control("governance")), ("bad00001", bad)],
            vec![("governance", vec!["good0001", "bad00001"])],
        );
        let err = validate_and_build(&raw).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].control_id, "bad00001");
    }

    #[test]
    fn shared_full_id_is_reported_once_per_extra_claimant() {
        let raw = catalog(
            vec![
                ("a0000001", control("governance")),
                ("b0000002", control("governance")),
                ("c0000003", control("governance")),
            ],
            vec![],
        );
        let err = validate_and_build(&raw).unwrap_err();
        let found: Vec<(&str, &str)> = err
            .violations()
            .iter()
            .map(|v| (v.control_id.as_str(), v.field.as_str()))
            .collect();
        assert_eq!(found, [("b0000002", "full_id"), ("c0000003", "full_id")]);
        assert!(err.violations()[0].detail.contains("already the full_id of a0000001"));
    }

    #[test]
    fn empty_catalog_is_a_violation() {
        let err = validate_and_build(&RawCatalog::default()).unwrap_err();
        assert_eq!(err.violations()[0].control_id, "*");
    }

    #[test]
    fn index_cross_checks_collect_all_problems() {
        let raw = catalog(
            vec![
                ("a0000001", control("governance")),
                ("b0000002", control("governance")),
                ("c0000003", control("security")),
            ],
            vec![
                ("governance", vec!["a0000001", "ghost001"]),
                ("security", vec!["b0000002"]),
                ("platform", vec![]),
            ],
        );
        let violations = validate_design_area_index(&raw.controls, &raw.design_areas);
        let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        assert!(details.iter().any(|d| d.contains("design_areas.platform")));
        assert!(details.iter().any(|d| d.contains("[ghost001]")));
        assert!(details.iter().any(|d| d.contains("[b0000002]") && d.contains("declares")));
        assert!(details.iter().any(|d| d.contains("[c0000003]") && d.contains("not listed")));
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn missing_index_is_derived_from_records() {
        let raw = catalog(vec![("c0000003", control("security"))], vec![]);
        let built = validate_and_build(&raw).unwrap();
        assert_eq!(built.controls_in_area(DesignArea::Security).len(), 1);
    }

    #[test]
    fn error_message_lists_every_violation() {
        let mut bad = control("governance");
        bad["severity"] = json!("Urgent");
        bad["control_type"] = json!("Native");
        let raw = catalog(vec![("bad00001", bad)], vec![]);
        let message = validate_and_build(&raw).unwrap_err().to_string();
        assert!(message.starts_with("2 taxonomy violation(s)"));
        assert!(message.contains("control_type"));
        assert!(message.contains("severity"));
    }
}
