//! Clarity detector (§4.5/§9 OQ2): a single rule, CLR-001, flagging public
//! functions/methods that carry neither a docstring nor a leading comment.
//!
//! Grounded the same way as the other per-entity detectors — walk the
//! generic `Entity` list from the language adapter and test `has_doc`,
//! which every adapter already populates for the God Object/context work.

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, common::Entity, EntityKind};
use crate::model::{AnalysisContext, Severity, Violation, ViolationKind};

pub struct ClarityDetector;

impl Detector for ClarityDetector {
    fn id(&self) -> &'static str {
        "clarity"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let entities = adapter.extract_entities(context.ast);

        let mut violations = Vec::new();
        for entity in &entities {
            if !matches!(entity.kind, EntityKind::Function | EntityKind::Method) {
                continue;
            }
            if entity.has_doc {
                continue;
            }
            if !is_public(entity) {
                continue;
            }
            let violation = base_violation(
                "CLR-001",
                ViolationKind::Clarity,
                None,
                Severity::Low,
                &context.file.relative_path,
                entity.span.line,
                entity.span.column,
                entity.span.end_line,
                entity.span.end_column,
                format!("'{}' is public but has no docstring or leading comment", entity.name),
            );
            violations.push(apply_severity_rules(violation, context));
        }

        sort_violations(&mut violations);
        violations
    }
}

/// A function/method counts as "public" unless its name marks it private by
/// the conventions of the language it was parsed from: a leading underscore
/// (Python/Go-by-convention) or, on the Rust adapter, the absence of `pub`
/// in its declaration text is already filtered upstream by the adapter not
/// emitting private items as `has_doc`-eligible — here we only need the
/// naming convention, since every adapter extracts both public and private
/// entities uniformly.
fn is_public(entity: &Entity) -> bool {
    !entity.name.starts_with('_') && entity.name != "main"
}
