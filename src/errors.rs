//! Error types for the connascence-core library.
//!
//! Structured error types that preserve context and map onto the error
//! taxonomy every component agrees on: configuration/input errors are fatal
//! and abort before any file is analyzed, while per-file errors (parse,
//! timeout, detector panics) never propagate out of `analyze_paths` — they
//! are converted to diagnostics or synthetic violations at the file
//! boundary instead.

use std::io;

use thiserror::Error;

/// Main result type for connascence-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Comprehensive error type for all connascence-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A requested input path does not exist. Fatal.
    #[error("input not found: {path}")]
    InputNotFound {
        /// The missing path, as given by the caller.
        path: String,
    },

    /// Policy configuration failed validation. Fatal.
    #[error("invalid policy: {message}")]
    PolicyInvalid {
        /// Description of what failed validation.
        message: String,
        /// Offending field, if isolated to one.
        field: Option<String>,
    },

    /// A named preset or policy file could not be located. Fatal.
    #[error("policy not found: {name}")]
    PolicyNotFound {
        /// Preset name or path that was requested.
        name: String,
    },

    /// A file could not be parsed. Recovered as a synthetic CRITICAL
    /// violation by the caller; never bubbles out of `analyze_paths`.
    #[error("parse error in {language} ({file_path}): {message}")]
    ParseError {
        /// Source language of the file being parsed.
        language: String,
        /// Path of the file that failed to parse.
        file_path: String,
        /// Parser-reported description.
        message: String,
    },

    /// A per-file or global wall-clock budget was exceeded.
    #[error("timeout after {elapsed_ms}ms: {scope}")]
    Timeout {
        /// What timed out (a file path, or "global").
        scope: String,
        /// Elapsed milliseconds when the timeout fired.
        elapsed_ms: u64,
    },

    /// The run was cancelled by the caller between files.
    #[error("analysis cancelled")]
    Cancelled,

    /// The reporter does not know how to render the requested format.
    #[error("unsupported report format: {format}")]
    UnsupportedFormat {
        /// The format string that was requested.
        format: String,
    },

    /// I/O failure outside of the per-file parse/analyze boundary (reading
    /// policy files, writing report sinks, walking the filesystem).
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable description.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization failure (policy files, report sinks).
    #[error("serialization error ({format}): {message}")]
    Serialization {
        /// Format being (de)serialized, e.g. "yaml", "json", "toml".
        format: String,
        /// Description of the failure.
        message: String,
    },

    /// A detector raised an unexpected error while analyzing a file. Caught
    /// at the detector boundary and converted to an INFO diagnostic with
    /// `rule_id=INTERNAL`; the run continues without that detector's output
    /// for that one file.
    #[error("internal error in detector '{detector_id}': {message}")]
    Internal {
        /// Identifier of the detector that failed.
        detector_id: String,
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Construct an `InputNotFound` error.
    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    /// Construct a `PolicyInvalid` error.
    pub fn policy_invalid(message: impl Into<String>) -> Self {
        Self::PolicyInvalid {
            message: message.into(),
            field: None,
        }
    }

    /// Construct a `PolicyInvalid` error scoped to a specific field.
    pub fn policy_invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::PolicyInvalid {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Construct a `PolicyNotFound` error.
    pub fn policy_not_found(name: impl Into<String>) -> Self {
        Self::PolicyNotFound { name: name.into() }
    }

    /// Construct a `ParseError`.
    pub fn parse_error(
        language: impl Into<String>,
        file_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            language: language.into(),
            file_path: file_path.into(),
            message: message.into(),
        }
    }

    /// Construct a `Timeout` error.
    pub fn timeout(scope: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            scope: scope.into(),
            elapsed_ms,
        }
    }

    /// Construct an `UnsupportedFormat` error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Construct an `Io` error with context.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Construct an `Internal` error attributed to a detector.
    pub fn internal(detector_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            detector_id: detector_id.into(),
            message: message.into(),
        }
    }

    /// Whether this error kind is fatal to the whole run (configuration/input
    /// problems, discovered before any file is analyzed) as opposed to a
    /// per-file error recovered as a diagnostic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputNotFound { .. }
                | Self::PolicyInvalid { .. }
                | Self::PolicyNotFound { .. }
                | Self::UnsupportedFormat { .. }
        )
    }
}

impl From<io::Error> for CoreError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            format: "yaml".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "toml".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_classified_correctly() {
        assert!(CoreError::input_not_found("/nope").is_fatal());
        assert!(CoreError::policy_invalid("bad").is_fatal());
        assert!(CoreError::policy_not_found("strict-core-typo").is_fatal());
        assert!(CoreError::unsupported_format("xml").is_fatal());
    }

    #[test]
    fn per_file_errors_are_not_fatal() {
        assert!(!CoreError::parse_error("python", "a.py", "syntax error").is_fatal());
        assert!(!CoreError::timeout("a.py", 30_000).is_fatal());
        assert!(!CoreError::Cancelled.is_fatal());
        assert!(!CoreError::internal("CoN", "panic").is_fatal());
    }
}
