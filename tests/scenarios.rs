//! End-to-end scenarios (spec.md §8 "concrete end-to-end scenarios"),
//! exercised through the public `connascence_core` API exactly the way an
//! embedding application or the `ccanalyze` binary would call it.

use std::io::Write;
use std::path::PathBuf;

use connascence_core::policy::waivers::Waiver;
use connascence_core::policy::Policy;
use connascence_core::{analyze_paths, AnalysisOptions, Severity};

fn write_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

/// Scenario A — positional parameters: `max_parameters = 3` flags a
/// seven-parameter function at `severity=HIGH`. CoP-001's table default is
/// MEDIUM (§4.5.1), but a positional count clearing the policy threshold by
/// more than double is escalated before the common severity rules run (see
/// `position::baseline_severity`), which is what this named scenario
/// requires.
#[test]
fn scenario_a_positional_parameters() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.py", "def f(a, b, c, d, e, f, g):\n    return a + b\n");

    let policy = Policy::load(
        "service-defaults",
        Some("thresholds:\n  max_parameters: 3\n"),
        Vec::new(),
    )
    .unwrap();

    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    let cop_violations: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "CoP-001")
        .collect();
    assert_eq!(cop_violations.len(), 1, "expected exactly one CoP-001 violation");
    assert_eq!(cop_violations[0].severity, Severity::High);
    assert_eq!(cop_violations[0].line, 1);
}

/// Scenario B — magic literal with allowlist: a single non-allowlisted
/// occurrence of `4242` must be flagged even though it never repeats.
#[test]
fn scenario_b_magic_literal_with_allowlist() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "b.py", "x = 0\ny = 1\nz = 2\ntimeout = 4242\n");

    let policy = Policy::load(
        "service-defaults",
        Some("thresholds:\n  magic_literal_allowlist: [\"0\", \"1\", \"2\"]\n"),
        Vec::new(),
    )
    .unwrap();

    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    let com_violations: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "CoM-001")
        .collect();
    assert_eq!(com_violations.len(), 1);
    assert_eq!(com_violations[0].severity, Severity::Medium);
    assert_eq!(
        com_violations[0].context.get("literal").and_then(|v| v.as_str()),
        Some("4242")
    );
}

/// Scenario C — duplicate algorithm cluster: two structurally-identical
/// functions produce two CoA-001 violations sharing a cluster id, at HIGH
/// severity, in deterministic (sorted) order. Per DESIGN.md Decision 3,
/// both copies live in the same file here, which is what the per-file
/// `AlgorithmDetector` can directly observe; the Aggregator's cross-file
/// escalation of an already-shared `body_hash` is covered separately in
/// `aggregator_cross_file.rs`.
#[test]
fn scenario_c_duplicate_algorithm_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let body = "def helper_one():\n    total = 0\n    total = total + 1\n    return total\n\n\
                def helper_two():\n    total = 0\n    total = total + 1\n    return total\n";
    write_file(dir.path(), "c.py", body);

    let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    let coa_violations: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "CoA-001")
        .collect();
    assert_eq!(coa_violations.len(), 2);
    assert!(coa_violations.iter().all(|v| v.severity == Severity::High));
    let cluster_ids: Vec<_> = coa_violations
        .iter()
        .filter_map(|v| v.context.get("cluster_id").and_then(|c| c.as_str()))
        .collect();
    assert_eq!(cluster_ids.len(), 2);
    assert_eq!(cluster_ids[0], cluster_ids[1]);
}

/// Scenario D — god-object CONFIG context suppression: a class with 28
/// trivial getter/setter pairs, classified CONFIG, must not trip GOD-001
/// even though its raw method count would trigger the general threshold.
#[test]
fn scenario_d_god_object_config_suppression() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = String::from("class DbConfig:\n");
    for i in 0..14 {
        source.push_str(&format!(
            "    def get_field_{i}(self):\n        return self._field_{i}\n\n    def set_field_{i}(self, value):\n        self._field_{i} = value\n\n"
        ));
    }
    write_file(dir.path(), "d.py", &source);

    let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    assert!(
        !report.violations.iter().any(|v| v.rule_id == "GOD-001"),
        "CONFIG-classified accessor class must not trip God Object"
    );
}

/// Scenario E — waiver expiry: an expired waiver does NOT waive the
/// violation; it surfaces in `violations` and a `WaiverExpired` diagnostic
/// is recorded.
#[test]
fn scenario_e_waiver_expiry() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "src/legacy/x.py",
        "def f(a, b, c, d, e, f, g):\n    return a\n",
    );

    let waiver = Waiver {
        rule_id: "CoP-001".to_string(),
        path_pattern: "src/legacy/**".to_string(),
        expires_on: Some(chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()),
        justification: "legacy code, revisit later".to_string(),
    };
    let policy = Policy::load(
        "service-defaults",
        Some("thresholds:\n  max_parameters: 3\n"),
        vec![waiver],
    )
    .unwrap();

    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    assert!(report.violations.iter().any(|v| v.rule_id == "CoP-001"));
    assert!(!report.waived_violations.iter().any(|v| v.rule_id == "CoP-001"));
    assert!(report
        .metrics
        .diagnostics
        .iter()
        .any(|d| matches!(d.kind, connascence_core::model::DiagnosticKind::WaiverExpired)));
}

/// Scenario F — parse error isolation: a syntactically invalid file yields
/// a CRITICAL `PARSE_ERROR` violation at 1:1, and a valid sibling file's
/// violations are unaffected.
#[test]
fn scenario_f_parse_error_isolation() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "broken.py", "def f(x):\n    return x + (\n");
    write_file(
        dir.path(),
        "ok.py",
        "def g(a, b, c, d, e, f, g):\n    return a\n",
    );

    let policy = Policy::load(
        "service-defaults",
        Some("thresholds:\n  max_parameters: 3\n"),
        Vec::new(),
    )
    .unwrap();

    let report = analyze_paths(&[dir.path().to_path_buf()], &policy, &AnalysisOptions::default()).unwrap();

    let parse_errors: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "PARSE_ERROR")
        .collect();
    assert_eq!(parse_errors.len(), 1);
    assert_eq!(parse_errors[0].severity, Severity::Critical);
    assert_eq!(parse_errors[0].line, 1);
    assert_eq!(parse_errors[0].column, 1);
    assert_eq!(parse_errors[0].file_path, "broken.py");

    assert!(report.violations.iter().any(|v| v.rule_id == "CoP-001" && v.file_path == "ok.py"));
    assert!(report.summary.budget_violated);
}
