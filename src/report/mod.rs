//! Reporter (§4.8 C8): serializes a `Report` to JSON, SARIF 2.1.0, or
//! Markdown with deterministic, byte-identical output across runs.
//!
//! JSON and Markdown are hand-written serializers, matching the teacher's
//! `bin/cli/output/markdown_report.rs` string-building style for Markdown;
//! a `serde_json::Value` tree (whose `Map` is a `BTreeMap` since this crate
//! does not enable serde_json's `preserve_order` feature) gives byte-stable
//! sorted keys for JSON for free. SARIF is new — the teacher does not emit
//! it — and is grounded directly on the OASIS schema shape described in
//! spec.md §4.8.

pub mod json;
pub mod markdown;
pub mod sarif;

use crate::errors::{CoreError, Result};
use crate::model::Report;

/// The three wire formats the core reporter supports (§4.8, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Sarif,
    Markdown,
}

impl ReportFormat {
    pub fn parse(name: &str) -> Result<ReportFormat> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "sarif" => Ok(ReportFormat::Sarif),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(CoreError::unsupported_format(other.to_string())),
        }
    }
}

/// Render `report` into `format`'s wire bytes (§6 `render`).
pub fn render(report: &Report, format: ReportFormat) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Json => json::render(report),
        ReportFormat::Sarif => sarif::render(report),
        ReportFormat::Markdown => Ok(markdown::render(report).into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_name_is_rejected() {
        assert!(ReportFormat::parse("xml").is_err());
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(ReportFormat::parse("JSON").unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::parse("Sarif").unwrap(), ReportFormat::Sarif);
        assert_eq!(ReportFormat::parse("MD").unwrap(), ReportFormat::Markdown);
    }
}
