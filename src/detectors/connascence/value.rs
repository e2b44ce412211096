//! Connascence of Value (CoV-001): a literal that also appears in a
//! configuration-looking assignment, repeated elsewhere in the same file
//! without routing through that configuration value.
//!
//! Spec describes this as a cross-module pattern ("multiple modules
//! referencing the same literal that also appears in configuration"); the
//! Aggregator's documented cross-file escalation (§4.7) only re-walks CoA
//! clusters and CoI mutation spans, so this detector's per-file pass treats
//! "module" as "distinct scope within this file" and records the literal in
//! `context` for any future cross-file correlation.

use std::collections::BTreeMap;

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

pub struct ValueDetector;

impl Detector for ValueDetector {
    fn id(&self) -> &'static str {
        "connascence.value"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;

        // Literals appearing directly on the right-hand side of a module-level
        // assignment are the "configuration" side of the pattern.
        let mut configured_literals: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        ast.walk(|node| {
            if !kinds.assignment_kinds.contains(&node.kind()) {
                return;
            }
            let Some(rhs) = node
                .child_by_field_name("right")
                .or_else(|| node.child_by_field_name("value"))
            else {
                return;
            };
            if kinds.number_literal_kinds.contains(&rhs.kind())
                || kinds.string_literal_kinds.contains(&rhs.kind())
            {
                let span = ast.span_of(rhs);
                configured_literals
                    .entry(ast.text(rhs).trim().to_string())
                    .or_insert((span.line, span.column));
            }
        });

        if configured_literals.is_empty() {
            return Vec::new();
        }

        let mut violations = Vec::new();
        ast.walk(|node| {
            let kind_name = node.kind();
            if !(kinds.number_literal_kinds.contains(&kind_name)
                || kinds.string_literal_kinds.contains(&kind_name))
            {
                return;
            }
            let text = ast.text(node).trim().to_string();
            let Some(&(config_line, _)) = configured_literals.get(&text) else {
                return;
            };
            let span = ast.span_of(node);
            if span.line == config_line {
                return; // the configuration assignment itself
            }
            let violation = base_violation(
                "CoV-001",
                ViolationKind::Connascence,
                Some(ConnascenceType::Value),
                Severity::Medium,
                &context.file.relative_path,
                span.line,
                span.column,
                span.line,
                span.column,
                format!("literal {text} duplicates a value also set via configuration at line {config_line}"),
            );
            let mut violation = apply_severity_rules(violation, context);
            violation
                .context
                .insert("literal".to_string(), serde_json::Value::String(text));
            violations.push(violation);
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
        ValueDetector.analyze(&ctx)
    }

    #[test]
    fn literal_duplicating_configuration_is_flagged() {
        let source = "MAX_RETRIES = 7\n\ndef f():\n    return 7\n";
        let violations = analyze(source);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "CoV-001");
    }

    #[test]
    fn no_configuration_assignment_means_no_findings() {
        let source = "def f():\n    return 7\n";
        assert!(analyze(source).is_empty());
    }
}
