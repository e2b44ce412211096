//! Connascence of Identity (CoI-001): a mutable module-level object mutated
//! from more than one function, so callers share an identity instead of a
//! value or interface.
//!
//! Per-file detection of the "module" half of the spec's "mutated from > 1
//! module" trigger; the Aggregator's cross-file escalation (§4.7) re-walks
//! these spans with petgraph across the whole run to catch the
//! cross-module case.

use std::collections::BTreeSet;

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, EntityKind};
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

pub struct IdentityDetector;

impl Detector for IdentityDetector {
    fn id(&self) -> &'static str {
        "connascence.identity"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;
        let entities = adapter.extract_entities(ast);
        let scopes: Vec<_> = entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Function | EntityKind::Method))
            .collect();

        let mut module_globals: BTreeSet<String> = BTreeSet::new();
        ast.walk(|node| {
            if !kinds.assignment_kinds.contains(&node.kind()) {
                return;
            }
            let span = ast.span_of(node);
            let is_module_level = !scopes
                .iter()
                .any(|e| e.span.line < span.line && span.line <= e.span.end_line);
            if !is_module_level {
                return;
            }
            let Some(lhs) = node.child_by_field_name("left") else {
                return;
            };
            if kinds.identifier_kinds.contains(&lhs.kind()) {
                module_globals.insert(ast.text(lhs).to_string());
            }
        });

        if module_globals.is_empty() {
            return Vec::new();
        }

        let mut mutating_scopes: std::collections::BTreeMap<String, BTreeSet<String>> =
            std::collections::BTreeMap::new();
        let mut first_mutation: std::collections::BTreeMap<String, (u32, u32)> =
            std::collections::BTreeMap::new();

        ast.walk(|node| {
            let is_assignment = kinds.assignment_kinds.contains(&node.kind());
            let is_attribute_mutation = node.kind().contains("subscript") || node.kind().contains("attribute");
            if !is_assignment && !is_attribute_mutation {
                return;
            }
            let span = ast.span_of(node);
            let Some(scope) = scopes
                .iter()
                .find(|e| e.span.line <= span.line && span.line <= e.span.end_line)
            else {
                return; // module-level mutation, not a cross-function case
            };

            let target = if is_assignment {
                node.child_by_field_name("left")
            } else {
                Some(node)
            };
            let Some(target) = target else { return };
            let root_name = leftmost_identifier(target, ast);
            let Some(root_name) = root_name else { return };
            if !module_globals.contains(&root_name) {
                return;
            }
            mutating_scopes
                .entry(root_name.clone())
                .or_default()
                .insert(scope.id.clone());
            first_mutation.entry(root_name).or_insert((span.line, span.column));
        });

        let mut violations = Vec::new();
        for (name, scope_set) in mutating_scopes {
            if scope_set.len() > 1 {
                let (line, column) = first_mutation.get(&name).copied().unwrap_or((0, 0));
                let mut violation = base_violation(
                    "CoI-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Identity),
                    Severity::High,
                    &context.file.relative_path,
                    line,
                    column,
                    line,
                    column,
                    format!("module-level object '{name}' is mutated from {} functions", scope_set.len()),
                );
                violation
                    .context
                    .insert("identity".to_string(), serde_json::Value::String(name));
                violations.push(apply_severity_rules(violation, context));
            }
        }

        sort_violations(&mut violations);
        violations
    }
}

fn leftmost_identifier(node: tree_sitter::Node<'_>, ast: &crate::ast::Ast) -> Option<String> {
    let mut current = node;
    loop {
        if let Some(obj) = current
            .child_by_field_name("object")
            .or_else(|| current.child_by_field_name("value"))
        {
            current = obj;
            continue;
        }
        return Some(ast.text(current).to_string());
    }
}
