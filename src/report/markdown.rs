//! Markdown reporter (§4.8): a human-readable summary written the way the
//! teacher's `bin/cli/output/markdown_report.rs` builds its report — a
//! single growing `String`, one `render_*` helper per section, pushed to
//! directly rather than templated.
//!
//! Unlike the teacher's report, which stamps a wall-clock generation date,
//! this one carries no timestamp unless `Report.generated_at` is set, so
//! that the bytes stay identical across runs of the same analysis
//! (§4.8's "deterministic, byte-identical output" contract applies to every
//! format, not only JSON).

use crate::model::{Report, Severity, Violation};

const TOP_VIOLATIONS_PER_SEVERITY: usize = 50;

pub fn render(report: &Report) -> String {
    let mut content = String::new();
    content.push_str("# Connascence Analysis Report\n\n");

    render_summary(&mut content, report);
    render_quality_scores(&mut content, report);

    if report.violations.is_empty() {
        content.push_str("No violations found.\n");
    } else {
        render_top_violations(&mut content, report);
        render_detector_metrics(&mut content, report);
    }

    render_waivers(&mut content, report);
    render_diagnostics(&mut content, report);

    content
}

fn render_summary(content: &mut String, report: &Report) {
    content.push_str("## Summary\n\n");
    content.push_str(&format!("- **Tool**: {} {}\n", report.tool_name, report.tool_version));
    if let Some(generated_at) = &report.generated_at {
        content.push_str(&format!("- **Generated**: {generated_at}\n"));
    }
    content.push_str(&format!("- **Files Analyzed**: {}\n", report.metrics.files_analyzed));
    content.push_str(&format!("- **Total Violations**: {}\n", report.summary.total_violations));
    content.push_str(&format!("- **Waived Violations**: {}\n", report.summary.waived_count));
    content.push_str(&format!(
        "- **Budget Violated**: {}\n\n",
        if report.summary.budget_violated { "yes" } else { "no" }
    ));
}

fn render_quality_scores(content: &mut String, report: &Report) {
    let scores = &report.summary.quality_scores;
    content.push_str("## Quality Scores\n\n");
    content.push_str("| Dimension | Score |\n");
    content.push_str("|---|---|\n");
    content.push_str(&format!("| Overall | {:.1} |\n", scores.overall));
    content.push_str(&format!("| Clarity | {:.1} |\n", scores.clarity));
    content.push_str(&format!("| Connascence | {:.1} |\n", scores.connascence));
    content.push_str(&format!("| NASA Power-of-Ten | {:.1} |\n\n", scores.nasa));
}

fn render_top_violations(content: &mut String, report: &Report) {
    content.push_str("## Top Violations by Severity\n\n");
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ] {
        let matching: Vec<&Violation> = report
            .violations
            .iter()
            .filter(|v| v.severity == severity)
            .take(TOP_VIOLATIONS_PER_SEVERITY)
            .collect();
        if matching.is_empty() {
            continue;
        }
        content.push_str(&format!("### {:?}\n\n", severity));
        content.push_str("| Rule | File | Line | Description |\n");
        content.push_str("|---|---|---|---|\n");
        for v in matching {
            content.push_str(&format!(
                "| {} | `{}` | {} | {} |\n",
                v.rule_id,
                v.file_path,
                v.line,
                escape_pipes(&v.description)
            ));
        }
        content.push('\n');
    }
}

fn render_detector_metrics(content: &mut String, report: &Report) {
    content.push_str("## Detector Metrics\n\n");
    content.push_str("| Detector | Count |\n");
    content.push_str("|---|---|\n");
    for (detector, count) in &report.summary.by_detector {
        content.push_str(&format!("| {detector} | {count} |\n"));
    }
    content.push('\n');
}

fn render_waivers(content: &mut String, report: &Report) {
    if report.waived_violations.is_empty() {
        return;
    }
    content.push_str("## Waived Violations\n\n");
    content.push_str("| Rule | File | Line |\n");
    content.push_str("|---|---|---|\n");
    for v in &report.waived_violations {
        content.push_str(&format!("| {} | `{}` | {} |\n", v.rule_id, v.file_path, v.line));
    }
    content.push('\n');
}

fn render_diagnostics(content: &mut String, report: &Report) {
    if report.metrics.diagnostics.is_empty() {
        return;
    }
    content.push_str("## Diagnostics\n\n");
    for d in &report.metrics.diagnostics {
        match &d.file_path {
            Some(path) => content.push_str(&format!("- `{path}`: {}\n", d.message)),
            None => content.push_str(&format!("- {}\n", d.message)),
        }
    }
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}
