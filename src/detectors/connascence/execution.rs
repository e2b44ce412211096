//! Connascence of Execution (CoE-001): a call whose precondition (another
//! call establishing required state on the same receiver) is never observed
//! earlier in the same function body.

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

/// `(precondition_suffix, dependent_suffix)` pairs: if `dependent_suffix` is
/// called on a receiver before `precondition_suffix` has been, that call
/// depends on implicit ordering instead of an explicit contract.
const ORDERING_PAIRS: &[(&str, &str)] = &[
    ("open", "read"),
    ("open", "write"),
    ("open", "close"),
    ("connect", "query"),
    ("connect", "execute"),
    ("acquire", "release"),
    ("start", "stop"),
    ("begin", "commit"),
    ("begin", "rollback"),
    ("init", "run"),
];

pub struct ExecutionDetector;

impl Detector for ExecutionDetector {
    fn id(&self) -> &'static str {
        "connascence.execution"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;

        let mut violations = Vec::new();

        for entity in adapter.extract_entities(ast) {
            if !matches!(
                entity.kind,
                crate::lang::EntityKind::Function | crate::lang::EntityKind::Method
            ) {
                continue;
            }

            // Collect (receiver, method_suffix, line, column) call sites inside this
            // entity's body, in source order.
            let mut calls: Vec<(String, String, u32, u32)> = Vec::new();
            ast.walk(|node| {
                if !kinds.call_kinds.contains(&node.kind()) {
                    return;
                }
                let span = ast.span_of(node);
                if span.line < entity.span.line || span.line > entity.span.end_line {
                    return;
                }
                let Some(callee) = node.child_by_field_name("function") else {
                    return;
                };
                let text = ast.text(callee);
                if let Some((receiver, method)) = text.rsplit_once('.') {
                    calls.push((receiver.to_string(), method.to_string(), span.line, span.column));
                }
            });
            calls.sort_by_key(|(_, _, line, column)| (*line, *column));

            for (precondition_suffix, dependent_suffix) in ORDERING_PAIRS {
                for (index, (receiver, method, line, column)) in calls.iter().enumerate() {
                    if method != dependent_suffix {
                        continue;
                    }
                    let satisfied = calls[..index]
                        .iter()
                        .any(|(r, m, _, _)| r == receiver && m == precondition_suffix);
                    if !satisfied {
                        let violation = base_violation(
                            "CoE-001",
                            ViolationKind::Connascence,
                            Some(ConnascenceType::Execution),
                            Severity::High,
                            &context.file.relative_path,
                            *line,
                            *column,
                            *line,
                            *column,
                            format!(
                                "'{receiver}.{dependent_suffix}' is called without a preceding '{receiver}.{precondition_suffix}' in the same function"
                            ),
                        );
                        violations.push(apply_severity_rules(violation, context));
                    }
                }
            }
        }

        sort_violations(&mut violations);
        violations.dedup_by(|a, b| a.fingerprint == b.fingerprint);
        violations
    }
}
