//! Connascence Core: a multi-dimensional static code-quality analyzer.
//!
//! Detects nine kinds of connascence coupling, God Object responsibility
//! sprawl, violations of the NASA "Power of Ten" safety-critical rules,
//! missing public-API documentation, and near-duplicate code, then scores
//! and reports the result deterministically across JSON, SARIF 2.1.0, and
//! Markdown.
//!
//! The library never initializes global logging state itself — callers
//! (the `ccanalyze` binary, or an embedding application) own the
//! `tracing_subscriber` installation.
//!
//! ```rust,no_run
//! use connascence_core::{analyze_paths, load_policy, render, AnalysisOptions, ReportFormat};
//! use std::path::PathBuf;
//!
//! let policy = load_policy("service-defaults").unwrap();
//! let report = analyze_paths(&[PathBuf::from("src")], &policy, &AnalysisOptions::default()).unwrap();
//! let bytes = render(&report, ReportFormat::Json).unwrap();
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_name_repetitions)]

#[cfg(all(feature = "mimalloc", not(feature = "jemalloc")))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod aggregator;
pub mod ast;
pub mod detectors;
pub mod discovery;
pub mod errors;
pub mod lang;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod registry;
pub mod report;

use std::path::{Path, PathBuf};

pub use crate::ast::cache::{AstCache, CacheOptions};
pub use crate::discovery::{DiscoveryOptions, DiscoveryResult};
pub use crate::errors::{CoreError, Result};
pub use crate::model::{AnalysisContext, Report, Severity, Violation};
pub use crate::orchestrator::{AnalysisOptions, CancelToken, OrchestratorOutput};
pub use crate::policy::Policy;
pub use crate::report::{render, ReportFormat};

/// Load a named preset or a path to an override document layered on top of
/// one (§4.3, §6 `load_policy`).
pub fn load_policy(preset_name_or_path: &str) -> Result<Policy> {
    Policy::load_from(preset_name_or_path)
}

/// Run the full pipeline over `paths`: discover files, parse and analyze
/// them under `policy`, and return the aggregated, scored `Report` (§6
/// `analyze_paths`).
///
/// Per-file failures (parse errors, timeouts, detector panics) never make
/// this call fail; they surface as `Diagnostic`s on the returned report's
/// metrics. Only input or configuration errors (an input path that does
/// not exist, a malformed policy) are returned as `Err`.
pub fn analyze_paths(paths: &[PathBuf], policy: &Policy, options: &AnalysisOptions) -> Result<Report> {
    let cancel = CancelToken::new();
    analyze_paths_cancellable(paths, policy, options, &cancel)
}

/// As `analyze_paths`, but takes an explicit `CancelToken` so a caller can
/// interrupt a long-running analysis (e.g. on SIGINT) from another thread.
pub fn analyze_paths_cancellable(
    paths: &[PathBuf],
    policy: &Policy,
    options: &AnalysisOptions,
    cancel: &CancelToken,
) -> Result<Report> {
    let discovery_options = DiscoveryOptions {
        include_globs: policy.include_globs.clone(),
        exclude_globs: if policy.exclude_globs.is_empty() {
            DiscoveryOptions::default().exclude_globs
        } else {
            policy.exclude_globs.clone()
        },
        max_file_size_bytes: options.max_file_size_bytes,
    };
    let discovered = discovery::discover(paths, &discovery_options)?;

    let cache = AstCache::new(CacheOptions {
        max_entries: options.cache_capacity,
        ..CacheOptions::default()
    });

    let mut output = orchestrator::run(&discovered.files, policy, &cache, options, cancel)?;
    for skipped in discovered.skipped {
        output.diagnostics.push(model::Diagnostic {
            kind: skipped.kind,
            file_path: Some(skipped.path),
            message: skipped.message,
        });
    }

    let waiver_today = current_date_for_waivers();
    let mut report = aggregator::aggregate(output, policy, options.determinism, waiver_today);
    if options.include_waived {
        report.violations.extend(report.waived_violations.clone());
        aggregator::total_order(&mut report.violations);
    }
    Ok(report)
}

/// The exit-code contract for `ccanalyze` (§6): 0 clean, 4 budget/`fail_on`
/// violated. Exposed so any embedder can reuse the same policy.
pub fn is_budget_violated(report: &Report) -> bool {
    report.summary.budget_violated
}

fn current_date_for_waivers() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Returns `true` if `path` looks like a policy preset name rather than a
/// filesystem path (no path separators, no extension).
pub fn is_preset_name(path: &str) -> bool {
    !path.contains(std::path::MAIN_SEPARATOR) && !path.contains('/') && !Path::new(path).exists()
}
