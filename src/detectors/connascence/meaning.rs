//! Connascence of Meaning (CoM-001): a literal repeated past a threshold, or
//! an unexplained "magic" value outside the policy's allowlist.
//!
//! Per §4.5.1's trigger ("numeric or string literal appearing > M times OR
//! with non-trivial value outside allowlist"), two independent conditions
//! can each flag a literal: repetition past `REPETITION_THRESHOLD`, or — for
//! numeric literals only, to avoid drowning in every non-empty string — a
//! single non-allowlisted occurrence whose magnitude puts it outside the
//! small range of values the allowlist convention treats as self-explanatory
//! (see `NONTRIVIAL_MAGNITUDE_FLOOR`).

use std::collections::BTreeMap;

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

/// A literal seen more than this many times in one file is flagged even if
/// it is not otherwise "magic" (spec's "> M times" trigger, M fixed here).
const REPETITION_THRESHOLD: usize = 3;

/// Numeric literals with an absolute value above this floor are treated as
/// "non-trivial" and flagged on first occurrence when outside the
/// allowlist; values at or below it (e.g. 0, 1, 2) are the kind of small
/// constant the allowlist convention already exists to exempt by name.
const NONTRIVIAL_MAGNITUDE_FLOOR: f64 = 2.0;

struct Occurrence {
    line: u32,
    column: u32,
    is_numeric: bool,
}

pub struct MeaningDetector;

impl Detector for MeaningDetector {
    fn id(&self) -> &'static str {
        "connascence.meaning"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;
        let allowlist = &context.policy_view.thresholds.magic_literal_allowlist;

        let mut occurrences: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();

        ast.walk(|node| {
            let kind_name = node.kind();
            let is_numeric = kinds.number_literal_kinds.contains(&kind_name);
            if is_numeric || kinds.string_literal_kinds.contains(&kind_name) {
                let span = ast.span_of(node);
                let text = ast.text(node).trim().to_string();
                occurrences.entry(text).or_default().push(Occurrence {
                    line: span.line,
                    column: span.column,
                    is_numeric,
                });
            }
        });

        let mut violations = Vec::new();
        for (literal, locations) in occurrences {
            let normalized = normalize(&literal);
            if allowlist.contains(&normalized) {
                continue;
            }

            let repeated = locations.len() > REPETITION_THRESHOLD;
            let nontrivial_value = locations.first().is_some_and(|o| o.is_numeric)
                && normalized.parse::<f64>().map(|n| n.abs() > NONTRIVIAL_MAGNITUDE_FLOOR).unwrap_or(true);

            if !repeated && !nontrivial_value {
                continue;
            }

            let reason = if repeated {
                format!("literal {literal} repeated {} times without a named constant", locations.len())
            } else {
                format!("magic literal {literal} used without a named constant")
            };

            for occurrence in &locations {
                let mut violation = base_violation(
                    "CoM-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Meaning),
                    Severity::Medium,
                    &context.file.relative_path,
                    occurrence.line,
                    occurrence.column,
                    occurrence.line,
                    occurrence.column,
                    reason.clone(),
                );
                violation
                    .context
                    .insert("literal".to_string(), serde_json::Value::String(literal.clone()));
                violations.push(apply_severity_rules(violation, context));
            }
        }

        sort_violations(&mut violations);
        violations
    }
}

/// Strip surrounding quotes so `"0"` and `0` share an allowlist identity
/// with the numeric literal `0`.
fn normalize(literal: &str) -> String {
    let trimmed = literal.trim_matches(|c| c == '"' || c == '\'');
    trimmed.to_string()
}
