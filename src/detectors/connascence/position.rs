//! Connascence of Position (CoP-001): a function definition or call site
//! with more positional arguments than the policy allows.

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

pub struct PositionDetector;

/// CoP-001's default severity is MEDIUM (§4.5.1), but a positional count
/// that clears the policy threshold by a wide margin (more than double) is
/// escalated to HIGH before the common severity rules run — this is what
/// makes spec.md §8 Scenario A's seven-parameter function against a
/// `max_parameters=3` policy come out HIGH rather than a bare MEDIUM.
fn baseline_severity(count: usize, max_parameters: usize) -> Severity {
    if count > max_parameters.saturating_mul(2) {
        Severity::High
    } else {
        Severity::Medium
    }
}

impl Detector for PositionDetector {
    fn id(&self) -> &'static str {
        "connascence.position"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let max_parameters = context.policy_view.thresholds.max_parameters as usize;

        let mut violations = Vec::new();
        for entity in adapter.extract_entities(context.ast) {
            if entity.params.len() > max_parameters {
                let violation = base_violation(
                    "CoP-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Position),
                    baseline_severity(entity.params.len(), max_parameters),
                    &context.file.relative_path,
                    entity.span.line,
                    entity.span.column,
                    entity.span.line,
                    entity.span.column,
                    format!(
                        "'{}' takes {} positional parameters (policy max {})",
                        entity.name,
                        entity.params.len(),
                        max_parameters
                    ),
                );
                violations.push(apply_severity_rules(violation, context));
            }
        }

        let kinds = adapter.node_kinds();
        let ast = context.ast;
        ast.walk(|node| {
            if !kinds.call_kinds.contains(&node.kind()) {
                return;
            }
            let Some(args) = node
                .child_by_field_name("arguments")
                .or_else(|| node.child_by_field_name("argument_list"))
            else {
                return;
            };
            let count = {
                let mut cursor = args.walk();
                args.children(&mut cursor)
                    .filter(|c| c.is_named())
                    .count()
            };
            if count > max_parameters {
                let span = ast.span_of(node);
                let violation = base_violation(
                    "CoP-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Position),
                    baseline_severity(count, max_parameters),
                    &context.file.relative_path,
                    span.line,
                    span.column,
                    span.line,
                    span.column,
                    format!("call site passes {count} positional arguments (policy max {max_parameters})"),
                );
                let violation = apply_severity_rules(violation, context);
                violations.push(violation);
            }
        });

        sort_violations(&mut violations);
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;
    use crate::lang::{python::PythonAdapter, LanguageAdapter};
    use crate::model::{ClassContextMap, Language, SourceFile};
    use crate::policy::Policy;
    use std::path::PathBuf;

    fn analyze(source: &str) -> Vec<Violation> {
        let ast: Ast = PythonAdapter.parse(source).unwrap();
        let file = SourceFile {
            path: PathBuf::from("a.py"),
            relative_path: "a.py".to_string(),
            language: Language::Python,
            content_hash: "h".to_string(),
            size_bytes: source.len() as u64,
        };
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let view = policy.view_for(&file.relative_path);
        let class_map = ClassContextMap::new();
        let lines: Vec<&str> = source.lines().collect();
        let ctx = AnalysisContext {
            file: &file,
            ast: &ast,
            policy_view: &view,
            class_context_map: &class_map,
            source_lines: &lines,
        };
        PositionDetector.analyze(&ctx)
    }

    #[test]
    fn function_exceeding_max_parameters_is_flagged() {
        let source = "def f(a, b, c, d, e):\n    return a\n";
        let violations = analyze(source);
        assert!(violations.iter().any(|v| v.rule_id == "CoP-001"));
    }

    #[test]
    fn function_within_limit_passes() {
        let source = "def f(a, b):\n    return a\n";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn function_far_over_limit_escalates_to_high() {
        // spec.md §8 Scenario A: seven parameters against max_parameters=3
        // must be reported at HIGH, not the bare CoP-001 default of MEDIUM.
        let source = "def f(a, b, c, d, e, f, g):\n    return a + b\n";
        let ast: Ast = PythonAdapter.parse(source).unwrap();
        let file = SourceFile {
            path: PathBuf::from("a.py"),
            relative_path: "a.py".to_string(),
            language: Language::Python,
            content_hash: "h".to_string(),
            size_bytes: source.len() as u64,
        };
        let policy = Policy::load(
            "service-defaults",
            Some("thresholds:\n  max_parameters: 3\n"),
            Vec::new(),
        )
        .unwrap();
        let view = policy.view_for(&file.relative_path);
        let class_map = ClassContextMap::new();
        let lines: Vec<&str> = source.lines().collect();
        let ctx = AnalysisContext {
            file: &file,
            ast: &ast,
            policy_view: &view,
            class_context_map: &class_map,
            source_lines: &lines,
        };
        let violations = PositionDetector.analyze(&ctx);
        let cop: Vec<_> = violations.iter().filter(|v| v.rule_id == "CoP-001").collect();
        assert_eq!(cop.len(), 1);
        assert_eq!(cop[0].severity, Severity::High);
    }

    #[test]
    fn function_just_over_limit_stays_medium() {
        let source = "def f(a, b, c, d):\n    return a\n";
        let policy = Policy::load(
            "service-defaults",
            Some("thresholds:\n  max_parameters: 3\n"),
            Vec::new(),
        )
        .unwrap();
        let ast: Ast = PythonAdapter.parse(source).unwrap();
        let file = SourceFile {
            path: PathBuf::from("a.py"),
            relative_path: "a.py".to_string(),
            language: Language::Python,
            content_hash: "h".to_string(),
            size_bytes: source.len() as u64,
        };
        let view = policy.view_for(&file.relative_path);
        let class_map = ClassContextMap::new();
        let lines: Vec<&str> = source.lines().collect();
        let ctx = AnalysisContext {
            file: &file,
            ast: &ast,
            policy_view: &view,
            class_context_map: &class_map,
            source_lines: &lines,
        };
        let violations = PositionDetector.analyze(&ctx);
        let cop: Vec<_> = violations.iter().filter(|v| v.rule_id == "CoP-001").collect();
        assert_eq!(cop.len(), 1);
        assert_eq!(cop[0].severity, Severity::Medium);
    }
}
