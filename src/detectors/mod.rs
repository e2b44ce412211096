//! Detector framework (§4.5 C5): the `Detector` trait every analysis rule
//! implements, plus the severity escalation/suppression rules common to all
//! of them.
//!
//! Grounded on `Zach-hammad-repotoire`'s `src/detectors/base.rs` (a trait
//! returning an ordered `Vec` of findings from an AST + context bundle) and
//! `src/detectors/mod.rs` (a static registry of such detectors).

pub mod clarity;
pub mod connascence;
pub mod context;
pub mod duplication;
pub mod god_object;
pub mod nasa;

use crate::lang::common::contains_security_keyword;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

/// A single analysis rule. Implementations must be pure with respect to the
/// AST and deterministic: identical `AnalysisContext` in, identical
/// `Violation` sequence out, including order (§4.5 common contract).
pub trait Detector: Send + Sync {
    /// Stable identifier used in the Detector Registry and diagnostics.
    fn id(&self) -> &'static str;

    /// Run this detector against one file and return its findings, already
    /// ordered by `(line, column, rule_id, fingerprint)` ascending.
    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation>;
}

/// Apply the four common severity-assignment rules (§4.5) to a freshly
/// produced violation, in order: baseline is already set by the detector,
/// so this applies escalation, suppression, then the policy floor.
pub fn apply_severity_rules(mut violation: Violation, context: &AnalysisContext) -> Violation {
    let is_critical_profile = context.policy_view.profile == "critical";
    let in_conditional = violation
        .context
        .get("in_conditional")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let security_context = contains_security_keyword(&violation.description)
        || contains_security_keyword(
            violation
                .context
                .get("symbol")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
        );

    if in_conditional || security_context || is_critical_profile {
        violation.severity = violation.severity.escalate();
    }

    let in_constant_assignment = violation
        .context
        .get("module_constant")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let in_config_class = violation
        .context
        .get("class_context")
        .and_then(|v| v.as_str())
        .map(|s| s == "CONFIG")
        .unwrap_or(false);
    if violation.connascence_type == Some(ConnascenceType::Meaning)
        && (in_constant_assignment || in_config_class)
    {
        violation.severity = Severity::Info;
    }

    if let Some(floor) = context.policy_view.severity_floor(&violation.rule_id) {
        if floor > violation.severity {
            violation.severity = floor;
        }
    }
    if let Some(&overridden) = context.policy_view.severity_overrides.get(&violation.rule_id) {
        violation.severity = overridden;
    }

    violation
}

/// Sort a detector's raw findings by the tie-break order spec.md §4.5.1
/// mandates: `(line, column, rule_id, fingerprint)` ascending.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        (a.line, a.column, &a.rule_id, &a.fingerprint).cmp(&(b.line, b.column, &b.rule_id, &b.fingerprint))
    });
}

/// Build a stable fingerprint for a violation: a hash of
/// `(rule_id, file_path, normalized_location)` (§3 Glossary "Fingerprint").
pub fn fingerprint(rule_id: &str, file_path: &str, line: u32, column: u32, extra: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(file_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(line.to_le_bytes());
    hasher.update(column.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(extra.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

pub fn base_violation(
    rule_id: impl Into<String>,
    kind: ViolationKind,
    connascence_type: Option<ConnascenceType>,
    severity: Severity,
    file_path: &str,
    line: u32,
    column: u32,
    end_line: u32,
    end_column: u32,
    description: impl Into<String>,
) -> Violation {
    let rule_id = rule_id.into();
    let description = description.into();
    let fp = fingerprint(&rule_id, file_path, line, column, &description);
    Violation {
        rule_id,
        kind,
        connascence_type,
        severity,
        file_path: file_path.to_string(),
        line,
        column,
        end_line,
        end_column,
        description,
        recommendation: None,
        snippet: None,
        fingerprint: fp,
        context: Default::default(),
    }
    .clamp_description()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViolationKind;

    #[test]
    fn fingerprints_are_stable_for_identical_inputs() {
        let a = fingerprint("CoN-001", "a.py", 3, 4, "foo");
        let b = fingerprint("CoN-001", "a.py", 3, 4, "foo");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprints_differ_on_location() {
        let a = fingerprint("CoN-001", "a.py", 3, 4, "foo");
        let b = fingerprint("CoN-001", "a.py", 3, 5, "foo");
        assert_ne!(a, b);
    }

    #[test]
    fn sort_orders_by_line_then_column_then_rule_then_fingerprint() {
        let mut violations = vec![
            base_violation("CoN-001", ViolationKind::Connascence, None, Severity::Low, "a.py", 5, 1, 5, 1, "x"),
            base_violation("CoN-001", ViolationKind::Connascence, None, Severity::Low, "a.py", 2, 1, 2, 1, "x"),
            base_violation("CoN-001", ViolationKind::Connascence, None, Severity::Low, "a.py", 2, 0, 2, 0, "x"),
        ];
        sort_violations(&mut violations);
        assert_eq!(violations[0].line, 2);
        assert_eq!(violations[0].column, 0);
        assert_eq!(violations[1].line, 2);
        assert_eq!(violations[1].column, 1);
        assert_eq!(violations[2].line, 5);
    }
}
