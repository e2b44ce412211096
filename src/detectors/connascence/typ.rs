//! Connascence of Type (CoT-001): a parameter or return value missing a type
//! annotation when its sibling functions in the same scope are annotated.

use std::collections::BTreeMap;

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, EntityKind};
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

pub struct TypeDetector;

impl Detector for TypeDetector {
    fn id(&self) -> &'static str {
        "connascence.type"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let entities = adapter.extract_entities(context.ast);

        let mut groups: BTreeMap<Option<String>, Vec<&crate::lang::Entity>> = BTreeMap::new();
        for entity in &entities {
            if matches!(entity.kind, EntityKind::Function | EntityKind::Method) {
                groups.entry(entity.parent_class.clone()).or_default().push(entity);
            }
        }

        let mut violations = Vec::new();
        for siblings in groups.values() {
            if siblings.len() < 2 {
                continue;
            }
            let any_return_annotated = siblings.iter().any(|e| e.return_annotated);
            let any_param_annotated = siblings
                .iter()
                .any(|e| e.params.iter().any(|p| p.annotated));

            for entity in siblings {
                if any_return_annotated && !entity.return_annotated {
                    violations.push(make_violation(
                        context,
                        entity,
                        format!(
                            "'{}' has no return type annotation while sibling functions do",
                            entity.name
                        ),
                    ));
                }
                if any_param_annotated {
                    for param in &entity.params {
                        if !param.annotated {
                            violations.push(make_violation(
                                context,
                                entity,
                                format!(
                                    "parameter '{}' of '{}' is unannotated while sibling parameters are",
                                    param.name, entity.name
                                ),
                            ));
                        }
                    }
                }
            }
        }

        sort_violations(&mut violations);
        violations
    }
}

fn make_violation(context: &AnalysisContext, entity: &crate::lang::Entity, description: String) -> Violation {
    let violation = base_violation(
        "CoT-001",
        ViolationKind::Connascence,
        Some(ConnascenceType::Type),
        Severity::Low,
        &context.file.relative_path,
        entity.span.line,
        entity.span.column,
        entity.span.line,
        entity.span.column,
        description,
    );
    apply_severity_rules(violation, context)
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
        TypeDetector.analyze(&ctx)
    }

    #[test]
    fn unannotated_sibling_is_flagged() {
        let source = "def a(x: int) -> int:\n    return x\n\ndef b(y):\n    return y\n";
        let violations = analyze(source);
        assert!(violations.iter().any(|v| v.description.contains("'b'")));
    }

    #[test]
    fn uniformly_unannotated_functions_pass() {
        let source = "def a(x):\n    return x\n\ndef b(y):\n    return y\n";
        assert!(analyze(source).is_empty());
    }
}
