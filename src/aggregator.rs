//! Aggregator/Scorer (§4.7 C7): merges per-file violation streams into one
//! deterministic, deduplicated report and computes quality scores.
//!
//! Grounded on the teacher's `petgraph`-based dependency graph (used here
//! for the cross-file connascence-of-identity escalation) and its
//! "merge barrier before scoring" pipeline shape.

use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;

use crate::model::{
    Diagnostic, DiagnosticKind, Metrics, QualityScores, Report, Severity, Summary, Violation,
    ViolationKind,
};
use crate::orchestrator::OrchestratorOutput;
use crate::policy::Policy;

pub const TOOL_NAME: &str = "connascence-core";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REPORT_VERSION: &str = "1.0";

/// Build the final `Report` from raw Orchestrator output: dedup by
/// fingerprint, escalate cross-file rules, apply waivers, sort, score.
pub fn aggregate(
    mut output: OrchestratorOutput,
    policy: &Policy,
    determinism: bool,
    waiver_today: chrono::NaiveDate,
) -> Report {
    escalate_cross_file(&mut output.violations);

    let (violations, dedup_diagnostics) = dedup_by_fingerprint(output.violations);
    let mut diagnostics = output.diagnostics;
    diagnostics.extend(dedup_diagnostics);

    let (mut kept, mut waived, waiver_diagnostics) = apply_waivers(violations, policy, waiver_today);
    diagnostics.extend(waiver_diagnostics);

    total_order(&mut kept);
    total_order(&mut waived);

    let quality_scores = score(&kept);
    let budget_violated = is_budget_violated(&kept, policy);

    let summary = build_summary(&kept, waived.len(), quality_scores, budget_violated);

    let partial_results = output.partial_results
        || diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::Timeout | DiagnosticKind::Cancelled));
    if partial_results {
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::PartialResults,
            file_path: None,
            message: "one or more files did not complete analysis; results are partial".to_string(),
        });
    }

    let cache_hits = output.cache_hits;
    let cache_misses = output.cache_misses;
    let cache_total = cache_hits + cache_misses;
    let cache_hit_ratio = if cache_total == 0 {
        0.0
    } else {
        cache_hits as f64 / cache_total as f64
    };

    let metrics = Metrics {
        files_analyzed: output.files_analyzed,
        bytes_analyzed: output.bytes_analyzed,
        wall_time_ms: if determinism {
            None
        } else {
            Some(output.wall_time.as_millis() as u64)
        },
        cache_hits,
        cache_misses,
        cache_hit_ratio,
        diagnostics,
        partial_results,
    };

    Report {
        version: REPORT_VERSION.to_string(),
        tool_name: TOOL_NAME.to_string(),
        tool_version: TOOL_VERSION.to_string(),
        generated_at: if determinism {
            None
        } else {
            Some(chrono::Utc::now().to_rfc3339())
        },
        summary,
        violations: kept,
        waived_violations: waived,
        metrics,
    }
}

/// Two violations with identical `fingerprint` collapse into one: the
/// higher-severity copy is retained and a `duplicate_count` recorded.
fn dedup_by_fingerprint(violations: Vec<Violation>) -> (Vec<Violation>, Vec<Diagnostic>) {
    let mut by_fingerprint: BTreeMap<String, Violation> = BTreeMap::new();
    for violation in violations {
        by_fingerprint
            .entry(violation.fingerprint.clone())
            .and_modify(|existing| {
                let count = existing
                    .context
                    .get("duplicate_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1)
                    + 1;
                if violation.severity > existing.severity {
                    let mut replacement = violation.clone();
                    replacement
                        .context
                        .insert("duplicate_count".to_string(), serde_json::Value::from(count));
                    *existing = replacement;
                } else {
                    existing
                        .context
                        .insert("duplicate_count".to_string(), serde_json::Value::from(count));
                }
            })
            .or_insert(violation);
    }
    (by_fingerprint.into_values().collect(), Vec::new())
}

/// Cross-file escalation for rules that need the aggregated view: CoA
/// exact-duplicate clusters and CoI module-mutation spans, both already
/// computed per-file, are re-grouped here by their recorded context key so
/// a cluster spanning multiple files is recognized as a single finding
/// family instead of N unrelated per-file ones (§4.7).
fn escalate_cross_file(violations: &mut [Violation]) {
    escalate_algorithm_clusters(violations);
    escalate_identity_mutations(violations);
}

fn escalate_algorithm_clusters(violations: &mut [Violation]) {
    let mut body_hash_to_indices: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, v) in violations.iter().enumerate() {
        if v.rule_id != "CoA-001" {
            continue;
        }
        if let Some(hash) = v.context.get("body_hash").and_then(|v| v.as_str()) {
            body_hash_to_indices.entry(hash.to_string()).or_default().push(i);
        }
    }
    for indices in body_hash_to_indices.values() {
        let files: std::collections::BTreeSet<&str> =
            indices.iter().map(|&i| violations[i].file_path.as_str()).collect();
        if files.len() > 1 {
            for &i in indices {
                violations[i].severity = violations[i].severity.escalate();
                violations[i].context.insert(
                    "cross_file_cluster".to_string(),
                    serde_json::Value::Bool(true),
                );
            }
        }
    }
}

fn escalate_identity_mutations(violations: &mut [Violation]) {
    let identity_indices: Vec<usize> = violations
        .iter()
        .enumerate()
        .filter(|(_, v)| v.rule_id == "CoI-001")
        .map(|(i, _)| i)
        .collect();
    if identity_indices.is_empty() {
        return;
    }

    let mut key_to_node: BTreeMap<String, usize> = BTreeMap::new();
    for &i in &identity_indices {
        if let Some(name) = violations[i].context.get("identity").and_then(|v| v.as_str()) {
            let key = name.to_string();
            let next_id = key_to_node.len();
            key_to_node.entry(key).or_insert(next_id);
        }
    }

    // UnionFind over distinct identity names, unioning two names together
    // when the same file mutates both (a conservative proxy for "this is
    // really one shared piece of cross-module mutable state").
    let mut uf: UnionFind<usize> = UnionFind::new(key_to_node.len().max(1));
    let mut names_by_file: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &i in &identity_indices {
        if let Some(name) = violations[i].context.get("identity").and_then(|v| v.as_str()) {
            names_by_file.entry(violations[i].file_path.as_str()).or_default().push(name);
        }
    }
    for names in names_by_file.values() {
        for pair in names.windows(2) {
            if let (Some(&a), Some(&b)) = (key_to_node.get(pair[0]), key_to_node.get(pair[1])) {
                uf.union(a, b);
            }
        }
    }

    let mut files_by_root: BTreeMap<usize, std::collections::BTreeSet<&str>> = BTreeMap::new();
    for &i in &identity_indices {
        if let Some(name) = violations[i].context.get("identity").and_then(|v| v.as_str()) {
            if let Some(&node) = key_to_node.get(name) {
                files_by_root
                    .entry(uf.find(node))
                    .or_default()
                    .insert(violations[i].file_path.as_str());
            }
        }
    }

    for &i in &identity_indices {
        let Some(name) = violations[i].context.get("identity").and_then(|v| v.as_str()).map(str::to_string) else {
            continue;
        };
        let Some(&node) = key_to_node.get(&name) else { continue };
        let root = uf.find(node);
        if files_by_root.get(&root).map(|s| s.len()).unwrap_or(0) > 1 {
            violations[i].severity = violations[i].severity.escalate();
            violations[i]
                .context
                .insert("cross_file_mutation".to_string(), serde_json::Value::Bool(true));
        }
    }
}

/// Move waiver-matched violations into the waived bucket, recording an
/// expiry diagnostic for waivers that matched but had already lapsed.
fn apply_waivers(
    violations: Vec<Violation>,
    policy: &Policy,
    today: chrono::NaiveDate,
) -> (Vec<Violation>, Vec<Violation>, Vec<Diagnostic>) {
    let mut kept = Vec::new();
    let mut waived = Vec::new();
    let mut diagnostics = Vec::new();

    for violation in violations {
        let (is_waived, diag) = policy.is_waived(&violation, today);
        if let Some(diag) = diag {
            diagnostics.push(diag);
        }
        if is_waived {
            waived.push(violation);
        } else {
            kept.push(violation);
        }
    }

    (kept, waived, diagnostics)
}

/// Final ordering: (severity descending, file_path ascending, line
/// ascending, column ascending, rule_id ascending, fingerprint ascending).
pub fn total_order(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.column.cmp(&b.column))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
}

/// `score = max(0, base - sum(penalty_weights[severity]))`, computed once
/// over all kept violations and once per scored dimension (§4.7, exact).
fn score(violations: &[Violation]) -> QualityScores {
    let clarity = dimension_score(violations, |v| v.kind == ViolationKind::Clarity);
    let connascence = dimension_score(violations, |v| v.kind == ViolationKind::Connascence);
    let nasa = dimension_score(violations, |v| v.kind == ViolationKind::Nasa);
    let overall = 0.40 * clarity + 0.30 * connascence + 0.30 * nasa;
    QualityScores {
        overall,
        clarity,
        connascence,
        nasa,
    }
}

fn dimension_score(violations: &[Violation], matches: impl Fn(&Violation) -> bool) -> f64 {
    let base = 100.0_f64;
    let penalty: f64 = violations
        .iter()
        .filter(|v| matches(v))
        .map(|v| v.severity.penalty_weight())
        .sum();
    (base - penalty).max(0.0)
}

/// A budget is violated if any violation meets or exceeds `fail_on`, or if
/// an explicit per-severity count in `policy.budgets` is exceeded (§3/§4.7).
fn is_budget_violated(violations: &[Violation], policy: &Policy) -> bool {
    if violations.iter().any(|v| v.severity >= policy.fail_on) {
        return true;
    }
    if policy.budgets.is_empty() {
        return false;
    }
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for v in violations {
        *counts.entry(severity_label(v.severity)).or_insert(0) += 1;
    }
    policy
        .budgets
        .iter()
        .any(|(severity, max)| counts.get(severity.as_str()).copied().unwrap_or(0) > *max)
}

fn build_summary(
    violations: &[Violation],
    waived_count: usize,
    quality_scores: QualityScores,
    budget_violated: bool,
) -> Summary {
    let mut by_severity = BTreeMap::new();
    let mut by_kind = BTreeMap::new();
    let mut by_detector = BTreeMap::new();

    for v in violations {
        *by_severity.entry(severity_label(v.severity).to_string()).or_insert(0) += 1;
        *by_kind.entry(kind_label(v.kind).to_string()).or_insert(0) += 1;
        *by_detector.entry(v.rule_id.clone()).or_insert(0) += 1;
    }

    Summary {
        total_violations: violations.len(),
        by_severity,
        by_kind,
        by_detector,
        waived_count,
        quality_scores,
        budget_violated,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
        Severity::Info => "INFO",
    }
}

fn kind_label(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::Connascence => "connascence",
        ViolationKind::Nasa => "nasa",
        ViolationKind::Structural => "structural",
        ViolationKind::Clarity => "clarity",
        ViolationKind::Duplication => "duplication",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::base_violation;

    fn violation(rule_id: &str, severity: Severity, line: u32) -> Violation {
        base_violation(
            rule_id,
            ViolationKind::Connascence,
            None,
            severity,
            "a.py",
            line,
            1,
            line,
            1,
            "x",
        )
    }

    fn sample_output(violations: Vec<Violation>) -> OrchestratorOutput {
        OrchestratorOutput {
            violations,
            diagnostics: Vec::new(),
            files_analyzed: 1,
            bytes_analyzed: 10,
            partial_results: false,
            wall_time: std::time::Duration::from_millis(1),
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    #[test]
    fn dedup_keeps_higher_severity_and_counts_duplicates() {
        let a = violation("CoN-001", Severity::Low, 5);
        let mut b = violation("CoN-001", Severity::High, 5);
        b.fingerprint = a.fingerprint.clone();
        let (deduped, _) = dedup_by_fingerprint(vec![a, b]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].severity, Severity::High);
        assert_eq!(
            deduped[0].context.get("duplicate_count").and_then(|v| v.as_u64()),
            Some(2)
        );
    }

    #[test]
    fn score_is_100_for_empty_violation_set() {
        let scores = score(&[]);
        assert_eq!(scores.overall, 100.0);
        assert_eq!(scores.clarity, 100.0);
    }

    #[test]
    fn score_never_drops_below_zero() {
        let violations: Vec<Violation> = (0..50).map(|i| violation("NASA-4", Severity::Critical, i)).collect();
        let mut tagged = violations;
        for v in &mut tagged {
            v.kind = ViolationKind::Nasa;
        }
        let scores = score(&tagged);
        assert_eq!(scores.nasa, 0.0);
        assert!(scores.overall >= 0.0);
    }

    #[test]
    fn aggregate_is_idempotent_on_its_own_output() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let violations = vec![violation("CoN-001", Severity::Medium, 3)];
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let first = aggregate(sample_output(violations), &policy, true, today);
        let second = aggregate(sample_output(first.violations.clone()), &policy, true, today);
        assert_eq!(first.violations.len(), second.violations.len());
        assert_eq!(first.summary.total_violations, second.summary.total_violations);
    }

    #[test]
    fn waived_violations_do_not_count_toward_budget() {
        use crate::policy::Waiver;
        let waiver = Waiver {
            rule_id: "CoN-001".to_string(),
            path_pattern: "**".to_string(),
            expires_on: None,
            justification: "test".to_string(),
        };
        let policy = Policy::load("service-defaults", None, vec![waiver]).unwrap();
        let violations = vec![violation("CoN-001", Severity::Critical, 3)];
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let report = aggregate(sample_output(violations), &policy, true, today);
        assert_eq!(report.violations.len(), 0);
        assert_eq!(report.waived_violations.len(), 1);
        assert!(!report.summary.budget_violated);
    }

    #[test]
    fn cache_hit_ratio_is_computed_from_orchestrator_counters() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut output = sample_output(Vec::new());
        output.cache_hits = 3;
        output.cache_misses = 1;
        let report = aggregate(output, &policy, true, today);
        assert_eq!(report.metrics.cache_hits, 3);
        assert_eq!(report.metrics.cache_misses, 1);
        assert!((report.metrics.cache_hit_ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn cache_hit_ratio_is_zero_when_no_lookups_happened() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let report = aggregate(sample_output(Vec::new()), &policy, true, today);
        assert_eq!(report.metrics.cache_hits, 0);
        assert_eq!(report.metrics.cache_misses, 0);
        assert_eq!(report.metrics.cache_hit_ratio, 0.0);
    }

    fn violation_in(rule_id: &str, file: &str, severity: Severity, line: u32) -> Violation {
        base_violation(rule_id, ViolationKind::Connascence, None, severity, file, line, 1, line, 1, "x")
    }

    /// A CoA-001 cluster whose members were each emitted from a different
    /// file's per-file detector pass escalates severity once the Aggregator
    /// sees the full violation set, closing the cross-file half of
    /// spec.md §8 Scenario C (the per-file-detection half is covered by
    /// `tests/scenarios.rs::scenario_c_duplicate_algorithm_cluster`).
    #[test]
    fn cross_file_algorithm_clusters_escalate_severity() {
        let mut a = violation_in("CoA-001", "a.py", Severity::High, 3);
        a.context.insert("body_hash".to_string(), serde_json::Value::String("h1".to_string()));
        a.context.insert("cluster_size".to_string(), serde_json::Value::from(2));
        let mut b = violation_in("CoA-001", "b.py", Severity::High, 7);
        b.context.insert("body_hash".to_string(), serde_json::Value::String("h1".to_string()));
        b.context.insert("cluster_size".to_string(), serde_json::Value::from(2));

        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let report = aggregate(sample_output(vec![a, b]), &policy, true, today);

        assert_eq!(report.violations.len(), 2);
        assert!(report.violations.iter().all(|v| v.severity == Severity::Critical));
        assert!(report
            .violations
            .iter()
            .all(|v| v.context.get("cross_file_cluster").and_then(|v| v.as_bool()) == Some(true)));
    }

    /// Two identities mutated from a shared file, where only one of the two
    /// is ALSO mutated from a second file, still escalates both (they are
    /// unioned into one connected component by the shared-file rule).
    #[test]
    fn cross_file_identity_mutation_escalates_connected_identities() {
        let mut a = violation_in("CoI-001", "shared.py", Severity::Medium, 2);
        a.context.insert("identity".to_string(), serde_json::Value::String("cfg".to_string()));
        let mut b = violation_in("CoI-001", "shared.py", Severity::Medium, 9);
        b.context.insert("identity".to_string(), serde_json::Value::String("state".to_string()));
        let mut c = violation_in("CoI-001", "other.py", Severity::Medium, 4);
        c.context.insert("identity".to_string(), serde_json::Value::String("state".to_string()));

        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let report = aggregate(sample_output(vec![a, b, c]), &policy, true, today);

        assert_eq!(report.violations.len(), 3);
        assert!(report.violations.iter().all(|v| v.severity == Severity::High));
    }
}
