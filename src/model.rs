//! Core data model: `SourceFile`, `AnalysisContext`, `Violation`, `Report`,
//! and the supporting enums shared by every component (§3 of the design).

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::detectors::context::ClassContext;
use crate::policy::PolicyView;

/// Source languages understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    C,
    Cpp,
    Java,
    Go,
    Rust,
}

impl Language {
    /// All languages the pipeline can parse, in a stable order.
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::Javascript,
        Language::Typescript,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Go,
        Language::Rust,
    ];

    /// Canonical lowercase name, used in rule metadata and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Infer a language from a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::Javascript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::Typescript),
            "c" | "h" => Some(Language::C),
            "cpp" | "cxx" | "cc" | "hpp" | "hxx" | "hh" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Infer a language from a shebang line (e.g. `#!/usr/bin/env python3`).
    pub fn from_shebang(first_line: &str) -> Option<Language> {
        if !first_line.starts_with("#!") {
            return None;
        }
        let line = first_line.to_ascii_lowercase();
        if line.contains("python") {
            Some(Language::Python)
        } else if line.contains("node") {
            Some(Language::Javascript)
        } else {
            None
        }
    }
}

/// An immutable record of one input file, as resolved by File Discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute, canonicalized path.
    pub path: PathBuf,
    /// Path relative to the project root, used in reports and fingerprints.
    pub relative_path: String,
    /// Inferred source language.
    pub language: Language,
    /// Stable content hash (SHA-256 truncated to 128 bits), hex-encoded.
    pub content_hash: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// A 1-based source span. `end_line`/`end_column` may equal the start for a
/// zero-width finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    /// A location-free span, per spec: `line=0` marks "no location known".
    pub fn unknown() -> Self {
        Span {
            line: 0,
            column: 0,
            end_line: 0,
            end_column: 0,
        }
    }

    pub fn point(line: u32, column: u32) -> Self {
        Span {
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }
}

/// The nine canonical connascence types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnascenceType {
    Name,
    Type,
    Meaning,
    Position,
    Algorithm,
    Execution,
    Timing,
    Value,
    Identity,
}

impl ConnascenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnascenceType::Name => "name",
            ConnascenceType::Type => "type",
            ConnascenceType::Meaning => "meaning",
            ConnascenceType::Position => "position",
            ConnascenceType::Algorithm => "algorithm",
            ConnascenceType::Execution => "execution",
            ConnascenceType::Timing => "timing",
            ConnascenceType::Value => "value",
            ConnascenceType::Identity => "identity",
        }
    }
}

/// Top-level classification of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Connascence,
    Nasa,
    Structural,
    Clarity,
    Duplication,
}

/// Severity levels, ordered from least to most severe for `Ord` purposes
/// this is reversed at the sort site since the report order is
/// severity-descending (see `aggregator::total_order`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One step up the ladder; saturates at `Critical`.
    pub fn escalate(self) -> Severity {
        match self {
            Severity::Info => Severity::Low,
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High => Severity::Critical,
            Severity::Critical => Severity::Critical,
        }
    }

    /// The scoring penalty weight, exactly as mandated by §4.7.
    pub fn penalty_weight(self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 5.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
            Severity::Info => 0.0,
        }
    }

    /// SARIF `level` mapping (§4.8).
    pub fn sarif_level(self) -> &'static str {
        match self {
            Severity::Critical | Severity::High => "error",
            Severity::Medium => "warning",
            Severity::Low => "note",
            Severity::Info => "none",
        }
    }
}

/// The atomic output unit produced by detectors and consumed by the
/// Aggregator and Reporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connascence_type: Option<ConnascenceType>,
    pub severity: Severity,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub fingerprint: String,
    #[serde(default)]
    pub context: IndexMap<String, serde_json::Value>,
}

impl Violation {
    /// Truncate `description` to the 240-character contract limit (§3),
    /// cutting on a char boundary.
    pub fn clamp_description(mut self) -> Self {
        const MAX: usize = 240;
        if self.description.chars().count() > MAX {
            self.description = self.description.chars().take(MAX).collect();
        }
        self
    }
}

/// Per-detector, per-file classification of entities (§4.5.3) keyed by a
/// stable node identifier built from the entity's span.
pub type ClassContextMap = BTreeMap<String, ClassContext>;

/// The diagnostic kinds recorded in `Report.metrics.diagnostics` (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SkippedTooLarge,
    SkippedUnreadable,
    SkippedUnknownLanguage,
    WaiverExpired,
    ParseError,
    Timeout,
    Cancelled,
    PartialResults,
    InternalError,
}

/// A single abnormal event recorded for the run, independent of violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub message: String,
}

/// Aggregate run metrics (§3 `Report.metrics`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub files_analyzed: usize,
    pub bytes_analyzed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_time_ms: Option<u64>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub diagnostics: Vec<Diagnostic>,
    pub partial_results: bool,
}

/// Counts and quality scores summarizing the violation set (§3 `summary`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_violations: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
    pub by_detector: BTreeMap<String, usize>,
    pub waived_count: usize,
    pub quality_scores: QualityScores,
    pub budget_violated: bool,
}

/// The four scores defined by the scoring function in §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub overall: f64,
    pub clarity: f64,
    pub connascence: f64,
    pub nasa: f64,
}

impl Default for QualityScores {
    fn default() -> Self {
        QualityScores {
            overall: 100.0,
            clarity: 100.0,
            connascence: 100.0,
            nasa: 100.0,
        }
    }
}

/// The top-level emitted artifact (§3 `Report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub version: String,
    pub tool_name: String,
    pub tool_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub summary: Summary,
    pub violations: Vec<Violation>,
    pub waived_violations: Vec<Violation>,
    pub metrics: Metrics,
}

/// Per-(file, detector) input bundle handed to every detector's `analyze`
/// call. Detectors read but never mutate the AST or file.
pub struct AnalysisContext<'a> {
    pub file: &'a SourceFile,
    pub ast: &'a crate::ast::Ast,
    pub policy_view: &'a PolicyView,
    pub class_context_map: &'a ClassContextMap,
    pub source_lines: &'a [&'a str],
}

impl<'a> AnalysisContext<'a> {
    /// Extract up to `max_lines` of source starting at 1-based `line`, for
    /// the `snippet` field (capped at 5 lines per §3).
    pub fn snippet(&self, line: u32, max_lines: usize) -> Option<String> {
        if line == 0 {
            return None;
        }
        let start = (line as usize).saturating_sub(1);
        let end = (start + max_lines).min(self.source_lines.len());
        if start >= self.source_lines.len() {
            return None;
        }
        Some(self.source_lines[start..end].join("\n"))
    }
}
