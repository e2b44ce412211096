//! NASA "Power of Ten" detector (§4.5.4): ten rule_ids, each a conservative
//! heuristic over the generic entity/AST shape rather than a language-precise
//! static analyzer — several rules are fundamentally language-dependent
//! (NASA-3's allocation model, NASA-9's pointer restrictions) and are
//! approximated per the Open Question 4 resolution in SPEC_FULL.md: every
//! rule emits real findings rather than silently no-opping.

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, common::Entity, EntityKind};
use crate::model::{AnalysisContext, Severity, Violation, ViolationKind};

pub struct NasaDetector;

const TRIVIAL_BODY_LINES: usize = 3;

impl Detector for NasaDetector {
    fn id(&self) -> &'static str {
        "nasa"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;
        let entities = adapter.extract_entities(ast);
        let functions: Vec<&Entity> = entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Function | EntityKind::Method))
            .collect();

        let mut violations = Vec::new();

        // NASA-1: unstructured control flow (goto) or recursive self-calls.
        for entity in &functions {
            if entity.body_text.contains("goto ") {
                violations.push(emit(
                    context,
                    "NASA-1",
                    Severity::Critical,
                    entity,
                    format!("'{}' uses unstructured control flow (goto)", entity.name),
                ));
            } else if is_directly_recursive(entity) {
                violations.push(emit(
                    context,
                    "NASA-1",
                    Severity::Critical,
                    entity,
                    format!("'{}' recurses directly; bound or restructure as iteration", entity.name),
                ));
            }
        }

        // NASA-2: loops without a statically visible upper bound (no literal
        // or obviously-bounded condition in a `while`/`for` header).
        ast.walk(|node| {
            let kind = node.kind();
            if kind != "while_statement" && kind != "for_statement" && kind != "while" {
                return;
            }
            let span = ast.span_of(node);
            let header_text = node
                .child_by_field_name("condition")
                .map(|c| ast.text(c).to_string())
                .unwrap_or_default();
            let looks_unbounded = header_text.is_empty()
                || header_text.trim() == "true"
                || header_text.trim() == "True"
                || header_text.trim() == "1";
            if looks_unbounded {
                violations.push(unlocated(
                    context,
                    "NASA-2",
                    Severity::Critical,
                    span.line,
                    span.column,
                    "loop has no statically determinable upper bound".to_string(),
                ));
            }
        });

        // NASA-3: dynamic allocation after an inferred initialization phase —
        // approximated as an allocation-looking call appearing after the
        // function's first quarter of statements.
        for entity in &functions {
            if let Some(line_offset) = late_allocation_offset(entity) {
                violations.push(unlocated(
                    context,
                    "NASA-3",
                    Severity::Critical,
                    entity.span.line + line_offset,
                    1,
                    format!("'{}' allocates dynamically outside its initialization phase", entity.name),
                ));
            }
        }

        // NASA-4: function body too long (profile-specific threshold).
        let max_function_lines = context.policy_view.thresholds.max_function_lines;
        for entity in &functions {
            let body_lines = entity.span.end_line.saturating_sub(entity.span.line).saturating_add(1);
            if body_lines > max_function_lines {
                violations.push(emit(
                    context,
                    "NASA-4",
                    Severity::High,
                    entity,
                    format!(
                        "'{}' is {} lines long (policy max {})",
                        entity.name, body_lines, max_function_lines
                    ),
                ));
            }
        }

        // NASA-5: fewer than two assertions/preconditions in a non-trivial
        // function (bodies longer than the trivial threshold).
        for entity in &functions {
            let non_empty_lines = entity.body_text.lines().filter(|l| !l.trim().is_empty()).count();
            if non_empty_lines <= TRIVIAL_BODY_LINES {
                continue;
            }
            let assertion_count = count_assertions(&entity.body_text);
            if assertion_count < 2 {
                violations.push(emit(
                    context,
                    "NASA-5",
                    Severity::High,
                    entity,
                    format!(
                        "'{}' has {} assertion(s)/preconditions; at least 2 expected",
                        entity.name, assertion_count
                    ),
                ));
            }
        }

        // NASA-6: variables declared far from their first use (approximated:
        // a declaration whose name's first use is more than 10 lines later).
        for entity in &functions {
            if let Some((var, decl_line)) = wide_scope_declaration(entity) {
                violations.push(unlocated(
                    context,
                    "NASA-6",
                    Severity::Medium,
                    decl_line,
                    1,
                    format!("'{var}' is declared far from its first use; narrow its scope"),
                ));
            }
        }

        // NASA-7: return value of a non-void call is discarded as a bare
        // expression statement (approximated: call statement not part of an
        // assignment/return/condition).
        ast.walk(|node| {
            if node.kind() != "expression_statement" {
                return;
            }
            let Some(inner) = node.named_child(0) else { return };
            if !kinds.call_kinds.contains(&inner.kind()) {
                return;
            }
            let text = ast.text(inner);
            if looks_side_effect_only(text) {
                return;
            }
            let span = ast.span_of(node);
            violations.push(unlocated(
                context,
                "NASA-7",
                Severity::Medium,
                span.line,
                span.column,
                format!("return value of '{text}' appears unused"),
            ));
        });

        // NASA-8: preprocessor/metaprogramming beyond declarations (macro
        // invocations with non-trivial bodies, C/C++ specific).
        ast.walk(|node| {
            if node.kind() != "preproc_function_def" && node.kind() != "preproc_def" {
                return;
            }
            let span = ast.span_of(node);
            let body_lines = ast.text(node).lines().count();
            if body_lines > 3 {
                violations.push(unlocated(
                    context,
                    "NASA-8",
                    Severity::Medium,
                    span.line,
                    span.column,
                    "preprocessor macro exceeds a simple declaration".to_string(),
                ));
            }
        });

        // NASA-9: pointer/reference arithmetic (C/C++/Rust raw pointer use).
        ast.walk(|node| {
            let kind = node.kind();
            if kind == "pointer_expression" || kind == "raw_pointer_type" {
                let span = ast.span_of(node);
                violations.push(unlocated(
                    context,
                    "NASA-9",
                    Severity::Medium,
                    span.line,
                    span.column,
                    "raw pointer use is restricted; prefer references/owned types".to_string(),
                ));
            }
        });

        // NASA-10: compiler/lint suppression comments treated as warnings
        // promoted to errors being bypassed.
        ast.walk(|node| {
            if !kinds.comment_kinds.contains(&node.kind()) {
                return;
            }
            let text = ast.text(node);
            if text.contains("#[allow(")
                || text.contains("// NOLINT")
                || text.contains("noqa")
                || text.contains("eslint-disable")
            {
                let span = ast.span_of(node);
                violations.push(unlocated(
                    context,
                    "NASA-10",
                    Severity::Medium,
                    span.line,
                    span.column,
                    "lint/warning suppression found; warnings must be treated as errors".to_string(),
                ));
            }
        });

        sort_violations(&mut violations);
        violations
    }
}

fn emit(context: &AnalysisContext, rule_id: &str, severity: Severity, entity: &Entity, description: String) -> Violation {
    let violation = base_violation(
        rule_id.to_string(),
        ViolationKind::Nasa,
        None,
        severity,
        &context.file.relative_path,
        entity.span.line,
        entity.span.column,
        entity.span.end_line,
        entity.span.end_column,
        description,
    );
    apply_severity_rules(violation, context)
}

fn unlocated(
    context: &AnalysisContext,
    rule_id: &str,
    severity: Severity,
    line: u32,
    column: u32,
    description: String,
) -> Violation {
    let violation = base_violation(
        rule_id.to_string(),
        ViolationKind::Nasa,
        None,
        severity,
        &context.file.relative_path,
        line,
        column,
        line,
        column,
        description,
    );
    apply_severity_rules(violation, context)
}

fn is_directly_recursive(entity: &Entity) -> bool {
    entity.body_text.contains(&format!("{}(", entity.name))
}

fn late_allocation_offset(entity: &Entity) -> Option<u32> {
    let alloc_markers = ["malloc(", "new ", "Box::new(", "vec![", "Vec::new(", "HashMap::new("];
    let lines: Vec<&str> = entity.body_text.lines().collect();
    if lines.len() < 8 {
        return None;
    }
    let cutoff = lines.len() / 4;
    for (i, line) in lines.iter().enumerate().skip(cutoff.max(1)) {
        if alloc_markers.iter().any(|m| line.contains(m)) {
            return Some(i as u32);
        }
    }
    None
}

fn count_assertions(body: &str) -> usize {
    let markers = ["assert", "debug_assert", "Assert.", "require(", "precondition"];
    body.lines()
        .filter(|line| markers.iter().any(|m| line.contains(m)))
        .count()
}

fn wide_scope_declaration(entity: &Entity) -> Option<(String, u32)> {
    let lines: Vec<&str> = entity.body_text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        let Some(var) = trimmed
            .strip_prefix("let ")
            .or_else(|| trimmed.strip_prefix("var "))
        else {
            continue;
        };
        let var_name: String = var.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
        if var_name.is_empty() {
            continue;
        }
        let last_use = lines
            .iter()
            .enumerate()
            .skip(i + 1)
            .rev()
            .find(|(_, l)| l.contains(&var_name))
            .map(|(idx, _)| idx);
        if let Some(last_idx) = last_use {
            if last_idx.saturating_sub(i) > 10 {
                return Some((var_name, entity.span.line + i as u32));
            }
        }
    }
    None
}

fn looks_side_effect_only(call_text: &str) -> bool {
    let side_effect_markers = [
        "print(", "println!", "log", "write", "send", "emit", "publish", "notify", "assert", "panic!",
    ];
    side_effect_markers.iter().any(|m| call_text.contains(m))
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
        NasaDetector.analyze(&ctx)
    }

    #[test]
    fn oversized_function_triggers_nasa_4() {
        let mut source = String::from("def f():\n");
        for _ in 0..80 {
            source.push_str("    x = 1\n");
        }
        source.push_str("    return x\n");
        let violations = analyze(&source);
        assert!(violations.iter().any(|v| v.rule_id == "NASA-4"));
    }

    #[test]
    fn recursive_function_triggers_nasa_1() {
        let source = "def fact(n):\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\n";
        let violations = analyze(source);
        assert!(violations.iter().any(|v| v.rule_id == "NASA-1"));
    }

    #[test]
    fn small_function_with_assertions_is_quiet_on_nasa_4_and_5() {
        let source = "def f(x):\n    assert x > 0\n    assert x < 100\n    return x\n";
        let violations = analyze(source);
        assert!(!violations.iter().any(|v| v.rule_id == "NASA-4"));
        assert!(!violations.iter().any(|v| v.rule_id == "NASA-5"));
    }
}
