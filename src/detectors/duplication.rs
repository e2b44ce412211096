//! Duplication / MECE detector (§4.5.5 C5): exact-fingerprint clustering
//! (shared with the Algorithm/CoA detector) plus a second MECE pass over the
//! remaining functions using shingled token-set Jaccard similarity.

use std::collections::{BTreeMap, BTreeSet};

use crate::detectors::connascence::algorithm::exact_clusters;
use crate::detectors::{apply_severity_rules, base_violation, Detector};
use crate::lang::{self, common::Entity};
use crate::model::{AnalysisContext, Severity, Violation, ViolationKind};

/// Token-shingle size for MECE similarity (SPEC_FULL §9 OQ3 resolution).
const SHINGLE_SIZE: usize = 5;
/// Minimum statements for a function to be eligible for duplication analysis.
const MIN_STATEMENTS: usize = 4;
/// Minimum cluster size for a MECE cluster to be reported.
const MIN_CLUSTER_SIZE: usize = 3;

pub struct DuplicationDetector;

impl Detector for DuplicationDetector {
    fn id(&self) -> &'static str {
        "duplication"
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<Violation> {
        let adapter = lang::adapter_for(context.file.language);
        let entities = adapter.extract_entities(context.ast);

        let min_lines = context.policy_view.thresholds.duplication_min_lines as usize;
        let threshold = context.policy_view.thresholds.duplication_similarity_threshold;

        let eligible: Vec<&Entity> = entities
            .iter()
            .filter(|e| statement_count(&e.body_text) >= min_lines.max(MIN_STATEMENTS))
            .collect();

        // Pass 1 members are excluded from pass 2's candidate pool.
        let exact = exact_clusters(&entities);
        let exact_ids: BTreeSet<&str> = exact
            .values()
            .flatten()
            .map(|e| e.id.as_str())
            .collect();

        let remaining: Vec<&Entity> = eligible
            .into_iter()
            .filter(|e| !exact_ids.contains(e.id.as_str()))
            .collect();

        let clusters = mece_clusters(&remaining, threshold);

        let mut violations = Vec::new();
        for (cluster_id, members) in clusters.into_iter().enumerate() {
            if members.len() < MIN_CLUSTER_SIZE {
                continue;
            }
            for member in &members {
                let mut violation = base_violation(
                    "DUP-001",
                    ViolationKind::Duplication,
                    None,
                    Severity::Medium,
                    &context.file.relative_path,
                    member.span.line,
                    member.span.column,
                    member.span.end_line,
                    member.span.end_column,
                    format!(
                        "'{}' is similar (≥{:.0}%) to {} other function(s) in this cluster",
                        member.name,
                        threshold * 100.0,
                        members.len() - 1
                    ),
                );
                violation
                    .context
                    .insert("cluster_id".to_string(), serde_json::Value::from(cluster_id));
                violation.context.insert(
                    "cluster_size".to_string(),
                    serde_json::Value::from(members.len()),
                );
                violations.push(apply_severity_rules(violation, context));
            }
        }

        // Deterministic: clusters already processed in lexicographic-minimum
        // order because `mece_clusters` sorts clusters that way and members
        // within a cluster keep that order too.
        violations
    }
}

fn statement_count(body: &str) -> usize {
    body.lines().filter(|l| !l.trim().is_empty()).count()
}

fn tokenize(body: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in body.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn shingles(tokens: &[String], size: usize) -> BTreeSet<String> {
    if tokens.len() < size {
        return tokens.iter().cloned().collect();
    }
    let mut set = BTreeSet::new();
    for window in tokens.windows(size) {
        set.insert(window.join(" "));
    }
    set
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Cluster functions whose pairwise shingle-Jaccard similarity is at least
/// `threshold`, using single-linkage union over a BTreeMap<id, cluster_root>
/// so ties resolve deterministically on entity id.
fn mece_clusters<'a>(entities: &[&'a Entity], threshold: f64) -> Vec<Vec<&'a Entity>> {
    let shingle_sets: Vec<BTreeSet<String>> = entities
        .iter()
        .map(|e| shingles(&tokenize(&e.body_text), SHINGLE_SIZE))
        .collect();

    let n = entities.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if jaccard(&shingle_sets[i], &shingle_sets[j]) >= threshold {
                let root_i = find(&mut parent, i);
                let root_j = find(&mut parent, j);
                if root_i != root_j {
                    let (lo, hi) = if root_i < root_j { (root_i, root_j) } else { (root_j, root_i) };
                    parent[hi] = lo;
                }
            }
        }
    }

    let mut grouped: BTreeMap<usize, Vec<&Entity>> = BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        grouped.entry(root).or_default().push(entities[i]);
    }

    let mut clusters: Vec<Vec<&Entity>> = grouped.into_values().collect();
    for members in &mut clusters {
        members.sort_by_key(|e| e.id.clone());
    }
    clusters.sort_by(|a, b| a[0].id.cmp(&b[0].id));
    clusters
}
