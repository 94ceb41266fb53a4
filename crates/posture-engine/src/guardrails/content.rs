//! Anti-drift content checks over rendered text.
//!
//! Patterns are compiled once per process. A pattern that fails to compile
//! is reported as a violation so the gate fails closed.

use std::sync::OnceLock;

use posture_core::config::CostMode;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::types::{AssembledOutput, DerivedConfidence, Recommendation};

type Compiled = Result<Regex, regex::Error>;

static COMPLIANCE_CLAIM: OnceLock<Compiled> = OnceLock::new();
static COST_FIGURE: OnceLock<Compiled> = OnceLock::new();
static HIGH_CONFIDENCE: OnceLock<Compiled> = OnceLock::new();
static CHECKLIST_ID: OnceLock<Compiled> = OnceLock::new();

fn compiled(
    cell: &'static OnceLock<Compiled>,
    source: &str,
    case_insensitive: bool,
) -> Result<&'static Regex, String> {
    cell.get_or_init(|| RegexBuilder::new(source).case_insensitive(case_insensitive).build())
        .as_ref()
        .map_err(|e| format!("guardrail pattern failed to compile: {e}"))
}

fn compliance_pattern() -> Result<&'static Regex, String> {
    compiled(
        &COMPLIANCE_CLAIM,
        r"\b(fails?|passes?|violates?|compliant with|non-compliant with)\s+(PCI[\s-]?DSS|HIPAA|SOC[\s-]?[12]|GDPR|FedRAMP|NIST|ISO[\s-]?27001|HITRUST)",
        true,
    )
}

fn cost_pattern() -> Result<&'static Regex, String> {
    compiled(
        &COST_FIGURE,
        r"\$\s?\d[\d,]*\.?\d*\s*/?\s*(month|year|hour|day|GB|TB|unit)?",
        true,
    )
}

fn high_confidence_pattern() -> Result<&'static Regex, String> {
    compiled(&HIGH_CONFIDENCE, r"\bhigh\s+confidence\b", true)
}

pub(crate) fn checklist_pattern() -> Result<&'static Regex, String> {
    compiled(&CHECKLIST_ID, r"^[A-Z]\d{2}\.\d{2}$", false)
}

/// Flag pass/fail claims against named compliance frameworks anywhere in
/// the output.
pub fn check_no_compliance_claims(output: &AssembledOutput) -> Vec<String> {
    let re = match compliance_pattern() {
        Ok(re) => re,
        Err(v) => return vec![v],
    };
    let value = match serde_json::to_value(output) {
        Ok(value) => value,
        Err(e) => return vec![format!("assembled output could not be inspected: {e}")],
    };
    let mut violations = Vec::new();
    walk_strings(&value, "$", &mut |path, text| {
        if let Some(m) = re.find(text) {
            violations.push(format!(
                "{path}: compliance claim '{}' is not allowed; report control status instead",
                m.as_str()
            ));
        }
    });
    violations
}

/// Flag dollar figures unless costs come from a pricing tool.
pub fn check_no_cost_numbers(label: &str, text: &str, mode: CostMode) -> Vec<String> {
    if mode == CostMode::ToolBacked {
        return Vec::new();
    }
    match cost_pattern() {
        Ok(re) => re
            .find_iter(text)
            .map(|m| {
                format!(
                    "{label}: cost figure '{}' without a pricing tool; use a Low/Medium/High category",
                    m.as_str().trim()
                )
            })
            .collect(),
        Err(v) => vec![v],
    }
}

/// "High confidence" may only appear next to a computed confidence.
pub fn check_confidence_has_basis(label: &str, text: &str, confidence: Option<&DerivedConfidence>) -> Vec<String> {
    match high_confidence_pattern() {
        Ok(re) if re.is_match(text) && confidence.is_none() => vec![format!(
            "{label}: claims high confidence without a computed confidence object"
        )],
        Ok(_) => Vec::new(),
        Err(v) => vec![v],
    }
}

pub fn validate_doc_refs(rec: &Recommendation) -> Vec<String> {
    let section = &rec.section;
    if rec.doc_refs.is_empty() {
        return vec![format!("{section}: no doc_refs found; cite at least one reference")];
    }
    let mut violations = Vec::new();
    for (i, doc) in rec.doc_refs.iter().enumerate() {
        if doc.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            violations.push(format!("{section} doc_ref[{i}]: missing 'url'."));
        }
        if doc.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            violations.push(format!("{section} doc_ref[{i}]: missing 'title'."));
        }
    }
    violations
}

/// Blend of control confidence and signal coverage.
///
/// `value = avg(control_confidences) * 0.7 + coverage_pct / 100 * 0.3`,
/// three decimals. Labels: High from 0.75, Medium from 0.45.
pub fn compute_derived_confidence(control_confidences: &[f64], signal_coverage_pct: f64) -> DerivedConfidence {
    if control_confidences.is_empty() {
        return DerivedConfidence {
            value: 0.0,
            basis: "No underlying controls".to_string(),
            label: "None".to_string(),
        };
    }
    let n = control_confidences.len();
    let avg = control_confidences.iter().sum::<f64>() / n as f64;
    let coverage = signal_coverage_pct.clamp(0.0, 100.0);
    let value = ((avg * 0.7 + coverage / 100.0 * 0.3) * 1000.0).round() / 1000.0;
    let label = if value >= 0.75 {
        "High"
    } else if value >= 0.45 {
        "Medium"
    } else {
        "Low"
    };
    DerivedConfidence {
        value,
        basis: format!("avg_control_confidence={avg:.2} ({n} controls), signal_coverage={coverage:.0}%"),
        label: label.to_string(),
    }
}

/// All content checks over an assembled output.
pub fn validate_content(output: &AssembledOutput, mode: CostMode) -> Vec<String> {
    let mut violations = check_no_compliance_claims(output);
    for driver in &output.cost_drivers {
        violations.extend(check_no_cost_numbers(
            &format!("cost_driver[{}]", driver.initiative_id),
            &driver.estimated_monthly_category,
            mode,
        ));
    }
    for impact in &output.decision_impacts {
        violations.extend(check_confidence_has_basis(
            &format!("decision_impact[{}]", impact.initiative_id),
            &impact.summary,
            impact.confidence.as_ref(),
        ));
    }
    for rec in &output.recommendations {
        violations.extend(check_confidence_has_basis(&rec.section, &rec.text, rec.confidence.as_ref()));
        violations.extend(validate_doc_refs(rec));
    }
    violations
}

fn walk_strings(value: &Value, path: &str, visit: &mut dyn FnMut(&str, &str)) {
    match value {
        Value::String(s) => visit(path, s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk_strings(item, &format!("{path}[{i}]"), visit);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk_strings(item, &format!("{path}.{key}"), visit);
            }
        }
        _ => {}
    }
}
