//! Orchestrator (§4.6 C6): schedules detector analysis across files on a
//! bounded worker pool, restoring no ordering of its own — the Aggregator
//! is solely responsible for the final deterministic order.
//!
//! Grounded on the teacher's `rayon`/`crossbeam` pairing for CPU-bound
//! per-file work (`src/core/pipeline.rs`'s worker pool) plus a
//! per-file timeout implemented with a `crossbeam::channel` + `recv_timeout`,
//! the same pattern the teacher uses around its embedding-generation stage
//! to bound a single slow unit of work without an async runtime.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ast::cache::AstCache;
use crate::detectors::{base_violation, sort_violations};
use crate::errors::CoreError;
use crate::lang;
use crate::model::{
    AnalysisContext, ClassContextMap, Diagnostic, DiagnosticKind, Severity, SourceFile, Violation,
    ViolationKind,
};
use crate::policy::Policy;
use crate::registry;

/// Runtime knobs exposed across the library boundary (§6 "Options").
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// `None` resolves to `available_parallelism()` capped at 16.
    pub workers: Option<usize>,
    pub per_file_timeout_ms: u64,
    pub cache_capacity: usize,
    pub max_file_size_bytes: u64,
    pub include_waived: bool,
    pub fail_on: Severity,
    /// When set, wall-time-dependent fields are omitted so two runs over the
    /// same tree produce byte-identical output.
    pub determinism: bool,
    /// Hard cap on violations reported per file (§5 bounded resources).
    pub max_violations_per_file: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            workers: None,
            per_file_timeout_ms: 30_000,
            cache_capacity: 10_000,
            max_file_size_bytes: 5 * 1024 * 1024,
            include_waived: false,
            fail_on: Severity::Critical,
            determinism: true,
            max_violations_per_file: 10_000,
        }
    }
}

fn resolve_workers(options: &AnalysisOptions) -> usize {
    options.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(16)
    })
}

/// A cooperative cancellation token, polled between files (§4.6).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw, per-file output of the worker pool — not yet deduplicated or
/// globally ordered; that's the Aggregator's job (§4.7).
pub struct OrchestratorOutput {
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
    pub files_analyzed: usize,
    pub bytes_analyzed: u64,
    pub partial_results: bool,
    pub wall_time: Duration,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Run every applicable detector over every file, respecting
/// `options.workers`, per-file timeouts, and cooperative cancellation.
pub fn run(
    files: &[SourceFile],
    policy: &Policy,
    cache: &AstCache,
    options: &AnalysisOptions,
    cancel: &CancelToken,
) -> Result<OrchestratorOutput, CoreError> {
    let started = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_workers(options))
        .build()
        .map_err(|e| CoreError::internal("orchestrator", e.to_string()))?;

    let per_file = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                if cancel.is_cancelled() {
                    return FileOutcome::cancelled(file);
                }
                analyze_one_file(file, policy, cache, options)
            })
            .collect::<Vec<_>>()
    });

    let mut violations = Vec::new();
    let mut diagnostics = Vec::new();
    let mut files_analyzed = 0usize;
    let mut bytes_analyzed = 0u64;
    let mut partial_results = cancel.is_cancelled();

    for outcome in per_file {
        diagnostics.extend(outcome.diagnostics);
        if outcome.cancelled {
            partial_results = true;
            continue;
        }
        files_analyzed += 1;
        bytes_analyzed += outcome.bytes;
        violations.extend(outcome.violations);
    }

    Ok(OrchestratorOutput {
        violations,
        diagnostics,
        files_analyzed,
        bytes_analyzed,
        partial_results,
        wall_time: started.elapsed(),
        cache_hits: cache.hits(),
        cache_misses: cache.misses(),
    })
}

struct FileOutcome {
    violations: Vec<Violation>,
    diagnostics: Vec<Diagnostic>,
    bytes: u64,
    cancelled: bool,
}

impl FileOutcome {
    fn cancelled(file: &SourceFile) -> Self {
        FileOutcome {
            violations: Vec::new(),
            diagnostics: vec![Diagnostic {
                kind: DiagnosticKind::Cancelled,
                file_path: Some(file.relative_path.clone()),
                message: "analysis cancelled before this file was scheduled".to_string(),
            }],
            bytes: 0,
            cancelled: true,
        }
    }
}

fn analyze_one_file(
    file: &SourceFile,
    policy: &Policy,
    cache: &AstCache,
    options: &AnalysisOptions,
) -> FileOutcome {
    let (tx, rx) = crossbeam::channel::bounded(1);
    let file = file.clone();
    let policy_view = policy.view_for(&file.relative_path);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let result = run_file_pipeline(&file, &policy_view, cache, options);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_millis(options.per_file_timeout_ms)) {
            Ok(Ok((violations, diags, bytes))) => FileOutcome {
                violations,
                diagnostics: diags,
                bytes,
                cancelled: false,
            },
            Ok(Err(diag)) => {
                let parse_violation = base_violation(
                    "PARSE_ERROR",
                    ViolationKind::Structural,
                    None,
                    Severity::Critical,
                    &file.relative_path,
                    1,
                    1,
                    1,
                    1,
                    diag.message.clone(),
                );
                FileOutcome {
                    violations: vec![parse_violation],
                    diagnostics: vec![diag],
                    bytes: 0,
                    cancelled: false,
                }
            }
            Err(_) => {
                warn!(file = %file.relative_path, "per-file analysis timed out");
                let timeout_violation = base_violation(
                    "TIMEOUT",
                    ViolationKind::Structural,
                    None,
                    Severity::Critical,
                    &file.relative_path,
                    0,
                    0,
                    0,
                    0,
                    format!(
                        "analysis exceeded the {}ms per-file budget; partial results discarded",
                        options.per_file_timeout_ms
                    ),
                );
                FileOutcome {
                    violations: vec![timeout_violation],
                    diagnostics: vec![Diagnostic {
                        kind: DiagnosticKind::Timeout,
                        file_path: Some(file.relative_path.clone()),
                        message: format!("exceeded {}ms", options.per_file_timeout_ms),
                    }],
                    bytes: 0,
                    cancelled: false,
                }
            }
        }
    })
}

type PipelineResult = Result<(Vec<Violation>, Vec<Diagnostic>, u64), Diagnostic>;

fn run_file_pipeline(
    file: &SourceFile,
    policy_view: &crate::policy::PolicyView,
    cache: &AstCache,
    options: &AnalysisOptions,
) -> PipelineResult {
    let path = file.path.clone();
    let adapter = lang::adapter_for(file.language);

    let ast = cache
        .get_or_parse(&file.content_hash, file.size_bytes, || {
            let source = read_source(&path)?;
            adapter.parse(&source)
        })
        .map_err(|err| parse_diagnostic(file, &err))?;

    let source_owned = ast.source().to_string();
    let source_lines: Vec<&str> = source_owned.lines().collect();
    let class_context_map = ClassContextMap::new();

    let context = AnalysisContext {
        file,
        ast: &ast,
        policy_view,
        class_context_map: &class_context_map,
        source_lines: &source_lines,
    };

    let detectors = registry::enabled_detectors_for(file.language, policy_view);
    let mut violations = Vec::new();
    let mut diagnostics = Vec::new();
    for detector in &detectors {
        let detector_id = detector.id();
        let produced = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| detector.analyze(&context)));
        match produced {
            Ok(mut found) => violations.append(&mut found),
            Err(_) => {
                warn!(detector = detector_id, file = %file.relative_path, "detector panicked");
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::InternalError,
                    file_path: Some(file.relative_path.clone()),
                    message: format!(
                        "rule_id=INTERNAL: detector '{detector_id}' failed; its findings for this file are omitted"
                    ),
                });
            }
        }
    }

    if violations.len() > options.max_violations_per_file {
        debug!(
            file = %file.relative_path,
            found = violations.len(),
            cap = options.max_violations_per_file,
            "truncating per-file violations to the configured cap"
        );
        violations.truncate(options.max_violations_per_file);
    }

    sort_violations(&mut violations);
    Ok((violations, diagnostics, file.size_bytes))
}

fn read_source(path: &Path) -> Result<String, CoreError> {
    std::fs::read_to_string(path).map_err(|e| CoreError::io(format!("reading {}", path.display()), e))
}

fn parse_diagnostic(file: &SourceFile, err: &CoreError) -> Diagnostic {
    Diagnostic {
        kind: DiagnosticKind::ParseError,
        file_path: Some(file.relative_path.clone()),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::cache::CacheOptions;
    use crate::model::Language;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn runs_detectors_across_multiple_files_without_panicking() {
        let (dir_a, path_a) = write_temp("def f(x):\n    return x + 1\n");
        let (_dir_b, path_b) = write_temp("def g(y):\n    return y + 2\n");
        let files = vec![
            SourceFile {
                path: path_a.clone(),
                relative_path: "a.py".to_string(),
                language: Language::Python,
                content_hash: "hash-a".to_string(),
                size_bytes: 20,
            },
            SourceFile {
                path: path_b.clone(),
                relative_path: "b.py".to_string(),
                language: Language::Python,
                content_hash: "hash-b".to_string(),
                size_bytes: 20,
            },
        ];
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let cache = AstCache::new(CacheOptions::default());
        let options = AnalysisOptions::default();
        let cancel = CancelToken::new();

        let output = run(&files, &policy, &cache, &options, &cancel).unwrap();
        assert_eq!(output.files_analyzed, 2);
        assert!(!output.partial_results);
        drop(dir_a);
    }

    #[test]
    fn parse_error_in_one_file_does_not_affect_another() {
        let (_dir_a, path_a) = write_temp("def f(x):\n    return x + (\n");
        let (_dir_b, path_b) = write_temp("def g(y):\n    return y + 2\n");
        let files = vec![
            SourceFile {
                path: path_a,
                relative_path: "broken.py".to_string(),
                language: Language::Python,
                content_hash: "hash-broken".to_string(),
                size_bytes: 20,
            },
            SourceFile {
                path: path_b,
                relative_path: "ok.py".to_string(),
                language: Language::Python,
                content_hash: "hash-ok".to_string(),
                size_bytes: 20,
            },
        ];
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let cache = AstCache::new(CacheOptions::default());
        let options = AnalysisOptions::default();
        let cancel = CancelToken::new();

        let output = run(&files, &policy, &cache, &options, &cancel).unwrap();
        assert_eq!(output.files_analyzed, 2);
        let parse_errors: Vec<_> = output
            .violations
            .iter()
            .filter(|v| v.rule_id == "PARSE_ERROR")
            .collect();
        assert_eq!(parse_errors.len(), 1);
        assert_eq!(parse_errors[0].file_path, "broken.py");
        assert_eq!(parse_errors[0].severity, Severity::Critical);
        assert_eq!(parse_errors[0].line, 1);
        assert_eq!(parse_errors[0].column, 1);
    }

    #[test]
    fn cancellation_before_scheduling_yields_no_analyzed_files() {
        let (_dir, path) = write_temp("def f():\n    return 1\n");
        let files = vec![SourceFile {
            path,
            relative_path: "a.py".to_string(),
            language: Language::Python,
            content_hash: "hash-a".to_string(),
            size_bytes: 10,
        }];
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let cache = AstCache::new(CacheOptions::default());
        let options = AnalysisOptions::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let output = run(&files, &policy, &cache, &options, &cancel).unwrap();
        assert_eq!(output.files_analyzed, 0);
        assert!(output.partial_results);
    }

    #[test]
    fn cache_hits_and_misses_are_reported_on_the_output() {
        // Two files sharing a content hash: the first is a cache miss, the
        // second a coalesced hit, so `OrchestratorOutput` must surface both
        // counters straight from the `AstCache` instead of hardcoding zero.
        let (_dir_a, path_a) = write_temp("def f(x):\n    return x + 1\n");
        let (_dir_b, path_b) = write_temp("def f(x):\n    return x + 1\n");
        let files = vec![
            SourceFile {
                path: path_a,
                relative_path: "a.py".to_string(),
                language: Language::Python,
                content_hash: "same-hash".to_string(),
                size_bytes: 25,
            },
            SourceFile {
                path: path_b,
                relative_path: "b.py".to_string(),
                language: Language::Python,
                content_hash: "same-hash".to_string(),
                size_bytes: 25,
            },
        ];
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let cache = AstCache::new(CacheOptions::default());
        let options = AnalysisOptions::default();
        let cancel = CancelToken::new();

        let output = run(&files, &policy, &cache, &options, &cancel).unwrap();
        assert_eq!(output.cache_misses, 1);
        assert_eq!(output.cache_hits, 1);
    }
}
