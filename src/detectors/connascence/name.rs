//! Connascence of Name (CoN-001): an imported symbol referenced across more
//! distinct function scopes than the design calls for, meaning a rename of
//! the import ripples across the whole file instead of one clear owner.

use std::collections::{BTreeMap, BTreeSet};

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::common::Entity;
use crate::lang::{self, EntityKind};
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

/// Imported symbols referenced from more than this many distinct scopes are
/// flagged; below it, fan-out is considered normal module usage.
const SCOPE_FAN_OUT_THRESHOLD: usize = 3;

pub struct NameDetector;

impl Detector for NameDetector {
    fn id(&self) -> &'static str {
        "connascence.name"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let kinds = adapter.node_kinds();
        let ast = context.ast;

        let mut imported_names: BTreeSet<String> = BTreeSet::new();
        ast.walk(|node| {
            if kinds.import_kinds.contains(&node.kind()) {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if kinds.identifier_kinds.contains(&child.kind()) {
                        imported_names.insert(ast.text(child).to_string());
                    }
                }
            }
        });

        if imported_names.is_empty() {
            return Vec::new();
        }

        let entities = adapter.extract_entities(ast);
        let scopes: Vec<&Entity> = entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Function | EntityKind::Method))
            .collect();

        let mut usages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut first_location: BTreeMap<String, (u32, u32)> = BTreeMap::new();

        ast.walk(|node| {
            if !kinds.identifier_kinds.contains(&node.kind()) {
                return;
            }
            let text = ast.text(node);
            if !imported_names.contains(text) {
                return;
            }
            let span = ast.span_of(node);
            let scope_id = scopes
                .iter()
                .find(|e| e.span.line <= span.line && span.line <= e.span.end_line)
                .map(|e| e.id.clone())
                .unwrap_or_else(|| "<module>".to_string());
            usages.entry(text.to_string()).or_default().insert(scope_id);
            first_location
                .entry(text.to_string())
                .and_modify(|(line, col)| {
                    if span.line < *line || (span.line == *line && span.column < *col) {
                        *line = span.line;
                        *col = span.column;
                    }
                })
                .or_insert((span.line, span.column));
        });

        let mut violations = Vec::new();
        for (symbol, scope_set) in usages {
            if scope_set.len() > SCOPE_FAN_OUT_THRESHOLD {
                let (line, column) = first_location.get(&symbol).copied().unwrap_or((0, 0));
                let mut violation = base_violation(
                    "CoN-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Name),
                    Severity::Low,
                    &context.file.relative_path,
                    line,
                    column,
                    line,
                    column,
                    format!(
                        "imported symbol '{symbol}' is referenced from {} distinct scopes",
                        scope_set.len()
                    ),
                );
                violation
                    .context
                    .insert("symbol".to_string(), serde_json::Value::String(symbol));
                violation.recommendation = Some(
                    "narrow the import's usage to fewer owners, or promote it to a shared module boundary"
                        .to_string(),
                );
                violations.push(apply_severity_rules(violation, context));
            }
        }

        sort_violations(&mut violations);
        violations
    }
}
