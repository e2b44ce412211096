//! SARIF 2.1.0 reporter (§4.8). Not present in the teacher, which has no
//! SARIF output path; this is grounded directly on the OASIS schema shape
//! spec.md §4.8 describes: one `runs[]` entry per contributing analyzer
//! kind, `level` mapped from severity, `partialFingerprints.canonicalFingerprint`
//! set to the violation's own fingerprint, results sorted by `(ruleId,
//! fingerprint)` within each run.
//!
//! `ViolationKind::Structural` (the God Object family) is not one of the
//! four kinds spec.md's SARIF section names (connascence, NASA, clarity,
//! duplication); rather than silently drop God Object findings from SARIF
//! output, they get their own `structural` run — an addition beyond the
//! letter of §4.8, noted in DESIGN.md, in keeping with "never silently
//! drop signal" (§9 design notes).

use serde_json::{json, Value};

use crate::errors::Result;
use crate::model::{Report, Violation, ViolationKind};

const SARIF_SCHEMA_URI: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

fn kind_label(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::Connascence => "connascence",
        ViolationKind::Nasa => "nasa",
        ViolationKind::Structural => "structural",
        ViolationKind::Clarity => "clarity",
        ViolationKind::Duplication => "duplication",
    }
}

const RUN_ORDER: [ViolationKind; 5] = [
    ViolationKind::Connascence,
    ViolationKind::Nasa,
    ViolationKind::Clarity,
    ViolationKind::Duplication,
    ViolationKind::Structural,
];

pub fn render(report: &Report) -> Result<Vec<u8>> {
    let mut runs = Vec::new();
    for kind in RUN_ORDER {
        let mut results: Vec<&Violation> = report
            .violations
            .iter()
            .chain(report.waived_violations.iter())
            .filter(|v| v.kind == kind)
            .collect();
        if results.is_empty() {
            continue;
        }
        results.sort_by(|a, b| (a.rule_id.as_str(), a.fingerprint.as_str()).cmp(&(b.rule_id.as_str(), b.fingerprint.as_str())));
        runs.push(build_run(kind, &results, report));
    }

    let document = json!({
        "version": "2.1.0",
        "$schema": SARIF_SCHEMA_URI,
        "runs": runs,
    });

    let mut bytes = serde_json::to_vec_pretty(&document)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn build_run(kind: ViolationKind, results: &[&Violation], report: &Report) -> Value {
    let rules = distinct_rules(results);
    json!({
        "tool": {
            "driver": {
                "name": format!("{}-{}", report.tool_name, kind_label(kind)),
                "version": report.tool_version,
                "informationUri": "https://github.com/nathanricedev/connascence-core",
                "rules": rules,
            }
        },
        "results": results.iter().map(|v| build_result(v)).collect::<Vec<_>>(),
    })
}

fn distinct_rules(results: &[&Violation]) -> Vec<Value> {
    let mut seen = std::collections::BTreeSet::new();
    let mut rules = Vec::new();
    for v in results {
        if seen.insert(v.rule_id.clone()) {
            rules.push(json!({
                "id": v.rule_id,
                "name": v.rule_id,
            }));
        }
    }
    rules
}

fn build_result(v: &Violation) -> Value {
    let mut properties = serde_json::Map::new();
    let category = v
        .connascence_type
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| v.rule_id.clone());
    properties.insert("category".to_string(), Value::String(category));
    for (k, value) in &v.context {
        properties.insert(k.clone(), value.clone());
    }

    json!({
        "ruleId": v.rule_id,
        "level": v.severity.sarif_level(),
        "message": { "text": v.description },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": { "uri": v.file_path },
                "region": {
                    "startLine": v.line.max(1),
                    "startColumn": v.column.max(1),
                    "endLine": v.end_line.max(v.line).max(1),
                    "endColumn": v.end_column.max(v.column).max(1),
                }
            }
        }],
        "partialFingerprints": { "canonicalFingerprint": v.fingerprint },
        "properties": Value::Object(properties),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::base_violation;
    use crate::model::{Metrics, QualityScores, Severity, Summary};

    fn report_with(violations: Vec<Violation>) -> Report {
        Report {
            version: "1.0".to_string(),
            tool_name: "connascence-core".to_string(),
            tool_version: "0.1.0".to_string(),
            generated_at: None,
            summary: Summary {
                quality_scores: QualityScores::default(),
                ..Default::default()
            },
            violations,
            waived_violations: Vec::new(),
            metrics: Metrics::default(),
        }
    }

    #[test]
    fn empty_report_has_no_runs() {
        let bytes = render(&report_with(Vec::new())).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["runs"].as_array().unwrap().len(), 0);
        assert_eq!(value["version"], "2.1.0");
    }

    #[test]
    fn one_run_per_contributing_kind() {
        let v1 = base_violation(
            "CoN-001",
            ViolationKind::Connascence,
            None,
            Severity::Low,
            "a.py",
            1,
            1,
            1,
            1,
            "x",
        );
        let v2 = base_violation(
            "GOD-001",
            ViolationKind::Structural,
            None,
            Severity::High,
            "b.py",
            2,
            2,
            2,
            2,
            "y",
        );
        let bytes = render(&report_with(vec![v1, v2])).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["runs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn severity_maps_to_sarif_level() {
        let v = base_violation(
            "NASA-4",
            ViolationKind::Nasa,
            None,
            Severity::Critical,
            "a.py",
            1,
            1,
            1,
            1,
            "x",
        );
        let bytes = render(&report_with(vec![v])).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["runs"][0]["results"][0]["level"], "error");
    }
}
