//! Connascence of Algorithm (CoA-001): two or more function bodies that are
//! structurally identical once identifiers and literals are normalized away.
//!
//! The normalization and hashing helpers here are shared with the
//! Duplication/MECE detector's exact-fingerprint pass (§4.5.5 pass 1), which
//! is the same trigger described from the "detector" side in §4.5.1's CoA
//! row.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::detectors::{apply_severity_rules, base_violation, sort_violations, Detector};
use crate::lang::{self, common::Entity};
use crate::model::{AnalysisContext, ConnascenceType, Severity, Violation, ViolationKind};

/// Bodies shorter than this many non-empty lines are excluded: trivial
/// one-liners (e.g. `pass`, `return None`) would otherwise dominate every
/// cluster with meaningless matches.
const MIN_BODY_LINES: usize = 3;

/// Normalize a function body by stripping identifiers and literal values,
/// collapsing whitespace, so structurally-identical-but-renamed bodies hash
/// equal.
pub fn normalize_body(body: &str) -> String {
    let mut normalized = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            if !normalized.ends_with(' ') {
                normalized.push(' ');
            }
        } else if c.is_ascii_digit() {
            normalized.push('#');
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() || next == '.' {
                    chars.next();
                } else {
                    break;
                }
            }
        } else if c == '"' || c == '\'' {
            normalized.push('$');
            let quote = c;
            for next in chars.by_ref() {
                if next == quote {
                    break;
                }
            }
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            ident.push(c);
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    ident.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if is_keyword(&ident) {
                normalized.push_str(&ident);
            } else {
                normalized.push('@');
            }
        } else {
            normalized.push(c);
        }
    }
    normalized
}

fn is_keyword(ident: &str) -> bool {
    matches!(
        ident,
        "if" | "else"
            | "elif"
            | "for"
            | "while"
            | "return"
            | "def"
            | "fn"
            | "function"
            | "class"
            | "let"
            | "const"
            | "var"
            | "break"
            | "continue"
            | "try"
            | "except"
            | "catch"
            | "finally"
            | "true"
            | "false"
            | "null"
            | "none"
            | "None"
            | "True"
            | "False"
    )
}

pub fn body_hash(body: &str) -> String {
    let normalized = normalize_body(body);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Group eligible entities (functions/methods with a non-trivial body) by
/// their normalized structural hash. Clusters with fewer than 2 members are
/// dropped.
pub fn exact_clusters<'a>(entities: &'a [Entity]) -> BTreeMap<String, Vec<&'a Entity>> {
    let mut by_hash: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
    for entity in entities {
        let non_empty_lines = entity.body_text.lines().filter(|l| !l.trim().is_empty()).count();
        if non_empty_lines < MIN_BODY_LINES {
            continue;
        }
        let hash = body_hash(&entity.body_text);
        by_hash.entry(hash).or_default().push(entity);
    }
    by_hash.retain(|_, members| members.len() >= 2);
    by_hash
}

pub struct AlgorithmDetector;

impl Detector for AlgorithmDetector {
    fn id(&self) -> &'static str {
        "connascence.algorithm"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let entities = adapter.extract_entities(context.ast);
        let clusters = exact_clusters(&entities);

        let mut violations = Vec::new();
        for (hash, members) in &clusters {
            let mut sorted_members = members.clone();
            sorted_members.sort_by_key(|e| e.id.clone());
            for entity in sorted_members {
                let mut violation = base_violation(
                    "CoA-001",
                    ViolationKind::Connascence,
                    Some(ConnascenceType::Algorithm),
                    Severity::High,
                    &context.file.relative_path,
                    entity.span.line,
                    entity.span.column,
                    entity.span.end_line,
                    entity.span.end_column,
                    format!(
                        "'{}' duplicates the structure of {} other function(s) in this file",
                        entity.name,
                        members.len() - 1
                    ),
                );
                violation.context.insert(
                    "cluster_size".to_string(),
                    serde_json::Value::from(members.len()),
                );
                violation
                    .context
                    .insert("body_hash".to_string(), serde_json::Value::String(hash.clone()));
                violations.push(apply_severity_rules(violation, context));
            }
        }

        sort_violations(&mut violations);
        violations
    }
}
