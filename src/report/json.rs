//! JSON reporter (§4.8): UTF-8, two-space indentation, sorted keys, newline
//! at EOF. Key sorting falls out of `serde_json::Value`'s `Map`, which is a
//! `BTreeMap` in this crate's build (the `preserve_order` feature is never
//! enabled), so converting the `Report` through `Value` before serializing
//! is sufficient — no manual key reordering needed.

use serde_json::ser::{PrettyFormatter, Serializer};
use serde::Serialize;

use crate::errors::Result;
use crate::model::Report;

pub fn render(report: &Report) -> Result<Vec<u8>> {
    let value = serde_json::to_value(report)?;
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metrics, QualityScores, Summary};

    fn empty_report() -> Report {
        Report {
            version: "1.0".to_string(),
            tool_name: "connascence-core".to_string(),
            tool_version: "0.1.0".to_string(),
            generated_at: None,
            summary: Summary {
                quality_scores: QualityScores::default(),
                ..Default::default()
            },
            violations: Vec::new(),
            waived_violations: Vec::new(),
            metrics: Metrics::default(),
        }
    }

    #[test]
    fn renders_two_space_indent_with_trailing_newline() {
        let bytes = render(&empty_report()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("  \"version\""));
    }

    #[test]
    fn keys_are_sorted_alphabetically() {
        let bytes = render(&empty_report()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let metrics_pos = text.find("\"metrics\"").unwrap();
        let summary_pos = text.find("\"summary\"").unwrap();
        let version_pos = text.find("\"version\"").unwrap();
        assert!(metrics_pos < summary_pos);
        assert!(summary_pos < version_pos);
    }

    #[test]
    fn identical_reports_render_byte_identical_output() {
        let a = render(&empty_report()).unwrap();
        let b = render(&empty_report()).unwrap();
        assert_eq!(a, b);
    }
}
