//! God Object detector (§4.5.2 C5): a class whose method count, size, or
//! cohesion signal that it has accumulated more than one responsibility.
//!
//! Grounded on `iepathos-debtmap`'s `src/organization/god_object/detector.rs`
//! (method-responsibility labeling, cohesion-by-shared-field heuristic):
//! this reuses that shape — infer a per-method responsibility label, union
//! them into a class-level responsibility set, and score cohesion from
//! shared field access — adapted to the spec's exact emission predicate and
//! the class-context classifier in §4.5.3.

use std::collections::BTreeSet;

use crate::detectors::context::{classify, ClassContext};
use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, common::Entity, EntityKind};
use crate::model::{AnalysisContext, Severity, Violation, ViolationKind};

/// The eight responsibility labels §4.5.2 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Responsibility {
    DataManagement,
    BusinessRule,
    Coordination,
    Transformation,
    Validation,
    Persistence,
    Communication,
    Configuration,
}

fn infer_responsibility(method: &Entity) -> Responsibility {
    let name = method.name.to_ascii_lowercase();
    if name.starts_with("validate") || name.starts_with("check") || name.starts_with("is_") || name.starts_with("ensure") {
        Responsibility::Validation
    } else if name.starts_with("save") || name.starts_with("load") || name.starts_with("persist") || name.contains("repository") {
        Responsibility::Persistence
    } else if name.starts_with("send") || name.starts_with("notify") || name.starts_with("publish") || name.starts_with("emit") {
        Responsibility::Communication
    } else if name.starts_with("configure") || name.starts_with("set_") || name.starts_with("init") {
        Responsibility::Configuration
    } else if name.starts_with("convert") || name.starts_with("transform") || name.starts_with("parse") || name.starts_with("format") {
        Responsibility::Transformation
    } else if name.starts_with("coordinate") || name.starts_with("orchestrate") || name.starts_with("dispatch") || name.starts_with("handle") {
        Responsibility::Coordination
    } else if name.starts_with("get_") || name.starts_with("fetch") || name.starts_with("find") || name.starts_with("query") {
        Responsibility::DataManagement
    } else {
        Responsibility::BusinessRule
    }
}

/// Fields a method body touches via `self.<field>` / `this.<field>`, used as
/// the cohesion proxy (shared field access between method pairs).
fn fields_touched(method: &Entity) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    for marker in ["self.", "this."] {
        let mut rest = method.body_text.as_str();
        while let Some(idx) = rest.find(marker) {
            rest = &rest[idx + marker.len()..];
            let field: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !field.is_empty() {
                fields.insert(field);
            }
        }
    }
    fields
}

/// Average, over every method pair, of
/// `(shared_field_accesses + shared_responsibility_label) / (1 + total_fields_touched)`,
/// matching §4.5.2's cohesion formula exactly.
fn cohesion_score(methods: &[(&Entity, Responsibility, BTreeSet<String>)]) -> f64 {
    if methods.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..methods.len() {
        for j in (i + 1)..methods.len() {
            let (_, resp_a, fields_a) = &methods[i];
            let (_, resp_b, fields_b) = &methods[j];
            let shared_fields = fields_a.intersection(fields_b).count();
            let shared_label = if resp_a == resp_b { 1 } else { 0 };
            let total_fields = fields_a.union(fields_b).count();
            total += (shared_fields + shared_label) as f64 / (1.0 + total_fields as f64);
            pairs += 1;
        }
    }
    (total / pairs as f64).clamp(0.0, 1.0)
}

pub struct GodObjectDetector;

impl Detector for GodObjectDetector {
    fn id(&self) -> &'static str {
        "god_object"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let entities = adapter.extract_entities(context.ast);

        let classes: Vec<&Entity> = entities.iter().filter(|e| e.kind == EntityKind::Class).collect();
        let mut violations = Vec::new();

        for class in classes {
            let methods: Vec<&Entity> = entities
                .iter()
                .filter(|e| e.kind == EntityKind::Method && e.parent_class.as_deref() == Some(class.name.as_str()))
                .collect();

            let class_context = context
                .class_context_map
                .get(&class.id)
                .copied()
                .unwrap_or_else(|| classify(class, &methods, &context.file.relative_path));

            let thresholds = &context.policy_view.thresholds;
            let (method_threshold, loc_threshold, cohesion_floor) =
                profile_adjusted_thresholds(class_context, thresholds);

            let total_loc = class
                .span
                .end_line
                .saturating_sub(class.span.line)
                .saturating_add(1);

            let labeled: Vec<(&Entity, Responsibility, BTreeSet<String>)> = methods
                .iter()
                .map(|m| (*m, infer_responsibility(m), fields_touched(m)))
                .collect();
            let responsibility_set: BTreeSet<Responsibility> =
                labeled.iter().map(|(_, r, _)| *r).collect();
            let cohesion = cohesion_score(&labeled);

            let method_count = methods.len() as u32;
            let triggers_on_size = method_count > method_threshold || total_loc > loc_threshold;
            let triggers_on_cohesion = cohesion < cohesion_floor && responsibility_set.len() >= 3;

            if triggers_on_size || triggers_on_cohesion {
                let mut violation = base_violation(
                    "GOD-001",
                    ViolationKind::Structural,
                    None,
                    Severity::High,
                    &context.file.relative_path,
                    class.span.line,
                    class.span.column,
                    class.span.end_line,
                    class.span.end_column,
                    format!(
                        "'{}' ({} methods, {} lines, cohesion {:.2}) shows signs of a God Object",
                        class.name, method_count, total_loc, cohesion
                    ),
                );
                violation.context.insert(
                    "class_context".to_string(),
                    serde_json::Value::String(class_context.as_str().to_string()),
                );
                violation
                    .context
                    .insert("method_count".to_string(), serde_json::Value::from(method_count));
                violation
                    .context
                    .insert("total_loc".to_string(), serde_json::Value::from(total_loc));
                violation.context.insert(
                    "cohesion_score".to_string(),
                    serde_json::Value::from(cohesion),
                );
                violation.context.insert(
                    "responsibility_count".to_string(),
                    serde_json::Value::from(responsibility_set.len()),
                );
                violations.push(apply_severity_rules(violation, context));
            }
        }

        sort_violations(&mut violations);
        violations
    }
}

fn profile_adjusted_thresholds(
    class_context: ClassContext,
    thresholds: &crate::policy::ThresholdSet,
) -> (u32, u32, f64) {
    // CONFIG classes legitimately accumulate many trivial accessors; widen
    // their thresholds rather than flagging every settings object.
    if class_context == ClassContext::Config {
        return (
            thresholds.god_object_method_threshold.saturating_mul(2),
            thresholds.god_object_loc_threshold.saturating_mul(2),
            thresholds.god_object_cohesion_floor / 2.0,
        );
    }
    (
        thresholds.god_object_method_threshold,
        thresholds.god_object_loc_threshold,
        thresholds.god_object_cohesion_floor,
    )
}
