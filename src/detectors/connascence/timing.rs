//! Connascence of Timing (CoTi-001): a sleep/poll call used as an implicit
//! synchronization primitive, a race-prone substitute for an explicit signal.

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang;
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

pub struct TimingDetector;

impl Detector for TimingDetector {
    fn id(&self) -> &'static str {
        "connascence.timing"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;

        let mut violations = Vec::new();
        ast.walk(|node| {
            if !kinds.call_kinds.contains(&node.kind()) {
                return;
            }
            let Some(callee) = node.child_by_field_name("function") else {
                return;
            };
            let text = ast.text(callee);
            let bare = text.rsplit('.').next().unwrap_or(text);
            let is_sleep_call = kinds
                .sleep_call_names
                .iter()
                .any(|name| *name == text || name.rsplit('.').next() == Some(bare));
            if !is_sleep_call {
                return;
            }
            let span = ast.span_of(node);
            let violation = base_violation(
                "CoTi-001",
                ViolationKind::Connascence,
                Some(ConnascenceType::Timing),
                Severity::High,
                &context.file.relative_path,
                span.line,
                span.column,
                span.line,
                span.column,
                format!("'{text}' used as a timing-based synchronization primitive"),
            );
            violations.push(apply_severity_rules(violation, context));
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
        TimingDetector.analyze(&ctx)
    }

    #[test]
    fn time_sleep_used_for_polling_is_flagged() {
        let source = "import time\n\ndef wait_ready():\n    time.sleep(1)\n    return True\n";
        let violations = analyze(source);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "CoTi-001");
    }

    #[test]
    fn unrelated_calls_are_not_flagged() {
        let source = "def f():\n    return compute()\n";
        assert!(analyze(source).is_empty());
    }
}
