//! `ccanalyze` - static code-quality analysis CLI.
//!
//! A thin `clap` front end over the `connascence_core` library, grounded on
//! the teacher's `bin/valknut.rs` driver: parse args, install logging, call
//! into the library, write the rendered report, map the outcome onto an
//! exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use connascence_core::{analyze_paths, load_policy, render, AnalysisOptions, ReportFormat, Severity};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static code-quality analysis across connascence, God Object, NASA
/// Power-of-Ten, clarity, and duplication dimensions.
#[derive(Parser)]
#[command(name = "ccanalyze")]
#[command(version = VERSION)]
#[command(about = "Static code-quality analysis: connascence, God Object, NASA Power-of-Ten, clarity, duplication")]
struct Cli {
    /// Paths to analyze (files or directories).
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Policy preset name (strict-core, service-defaults, experimental,
    /// nasa-jpl-pot10, modern-general) or a path to an override document.
    #[arg(long, default_value = "service-defaults")]
    policy: String,

    /// Output report format.
    #[arg(long, value_enum, default_value = "json")]
    format: CliFormat,

    /// Write the rendered report to this path instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Worker thread count; defaults to available parallelism capped at 16.
    #[arg(long)]
    workers: Option<usize>,

    /// Per-file analysis timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Include waived violations in the rendered report.
    #[arg(long)]
    include_waived: bool,

    /// Exit with code 4 once a violation at or above this severity appears
    /// (overrides the policy's own `fail_on`).
    #[arg(long, value_enum)]
    fail_on: Option<CliSeverity>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliFormat {
    Json,
    Sarif,
    Markdown,
}

impl From<CliFormat> for ReportFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Json => ReportFormat::Json,
            CliFormat::Sarif => ReportFormat::Sarif,
            CliFormat::Markdown => ReportFormat::Markdown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<CliSeverity> for Severity {
    fn from(value: CliSeverity) -> Self {
        match value {
            CliSeverity::Info => Severity::Info,
            CliSeverity::Low => Severity::Low,
            CliSeverity::Medium => Severity::Medium,
            CliSeverity::High => Severity::High,
            CliSeverity::Critical => Severity::Critical,
        }
    }
}

/// Process exit codes (§6): 0 clean, 1 unexpected error, 2 configuration
/// error, 4 budget/`fail_on` violated, 130 interrupted.
const EXIT_OK: u8 = 0;
const EXIT_UNEXPECTED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_BUDGET_VIOLATED: u8 = 4;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(error = %err, "ccanalyze failed");
            eprintln!("error: {err}");
            ExitCode::from(EXIT_UNEXPECTED)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut policy = match load_policy(&cli.policy) {
        Ok(policy) => policy,
        Err(err) if err.is_fatal() => {
            eprintln!("configuration error: {err}");
            return Ok(EXIT_CONFIG);
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(fail_on) = cli.fail_on {
        policy.fail_on = fail_on.into();
    }

    let options = AnalysisOptions {
        workers: cli.workers,
        per_file_timeout_ms: cli.timeout_ms,
        include_waived: cli.include_waived,
        fail_on: policy.fail_on,
        ..AnalysisOptions::default()
    };

    let report = analyze_paths(&cli.paths, &policy, &options)?;

    let bytes = render(&report, cli.format.into())?;
    match &cli.out {
        Some(path) => std::fs::write(path, bytes)?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }

    let was_cancelled = report
        .metrics
        .diagnostics
        .iter()
        .any(|d| matches!(d.kind, connascence_core::model::DiagnosticKind::Cancelled));

    if was_cancelled {
        Ok(130)
    } else if report.summary.budget_violated {
        Ok(EXIT_BUDGET_VIOLATED)
    } else {
        Ok(EXIT_OK)
    }
}
