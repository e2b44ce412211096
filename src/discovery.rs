//! File Discovery (§4.1 C1): resolve input paths into a deterministic,
//! filtered, ordered sequence of `SourceFile` records.
//!
//! Grounded on the teacher's `core/pipeline/file_discovery.rs`: `ignore`
//! crate traversal plus `globset` include/exclude compilation. The git-index
//! fast path is dropped — File Discovery here is a pure function of the
//! filesystem state handed to it, with no implicit dependency on a git
//! repository being present (see SPEC_FULL.md §4.1).

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::errors::{CoreError, Result};
use crate::model::{DiagnosticKind, Language, SourceFile};

/// Discovery inputs, all optional except the root paths themselves.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub max_file_size_bytes: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            include_globs: vec!["**/*".to_string()],
            exclude_globs: default_excludes(),
            max_file_size_bytes: 2 * 1024 * 1024,
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
    ]
}

/// A file skipped during discovery, recorded as an INFO diagnostic rather
/// than a violation (§4.1 rule 3).
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Result of a discovery pass: the ordered files to analyze, plus anything
/// that was skipped along the way.
#[derive(Debug, Default)]
pub struct DiscoveryResult {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Discover source files rooted at `inputs`.
///
/// Fails with `CoreError::InputNotFound` if any requested root does not
/// exist (§4.1 failure semantics).
pub fn discover(inputs: &[PathBuf], options: &DiscoveryOptions) -> Result<DiscoveryResult> {
    for root in inputs {
        if !root.exists() {
            return Err(CoreError::input_not_found(root.display().to_string()));
        }
    }

    let include = compile_globset(&options.include_globs)?;
    let exclude = compile_globset(&options.exclude_globs)?;

    let mut seen_canonical = HashSet::new();
    let mut collected: Vec<(PathBuf, PathBuf)> = Vec::new(); // (canonical, base)

    for root in inputs {
        let canonical_root = fs::canonicalize(root).unwrap_or_else(|_| root.clone());

        if canonical_root.is_file() {
            push_unique(&mut seen_canonical, &mut collected, canonical_root.clone(), canonical_root.parent().unwrap_or(&canonical_root).to_path_buf());
            continue;
        }

        let walker = WalkBuilder::new(&canonical_root)
            .standard_filters(true)
            .hidden(false)
            .build();

        for entry in walker {
            match entry {
                Ok(dir_entry) => {
                    if !dir_entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                        continue;
                    }
                    let path = dir_entry.path();
                    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                    push_unique(&mut seen_canonical, &mut collected, canonical, canonical_root.clone());
                }
                Err(err) => warn!("failed to walk entry: {err}"),
            }
        }
    }

    // Case-sensitive lexicographic ordering by canonical path (§4.1 rule 5).
    collected.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::with_capacity(collected.len());
    let mut skipped = Vec::new();

    for (path, base) in collected {
        let relative = path
            .strip_prefix(&base)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        if let Some(exclude) = &exclude {
            if exclude.is_match(&relative) {
                continue;
            }
        }
        if let Some(include) = &include {
            if !include.is_match(&relative) {
                continue;
            }
        }

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                skipped.push(SkippedFile {
                    path: relative,
                    kind: DiagnosticKind::SkippedUnreadable,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if metadata.len() > options.max_file_size_bytes {
            skipped.push(SkippedFile {
                path: relative,
                kind: DiagnosticKind::SkippedTooLarge,
                message: format!(
                    "{} bytes exceeds max_file_size_bytes ({})",
                    metadata.len(),
                    options.max_file_size_bytes
                ),
            });
            continue;
        }

        if metadata.len() == 0 {
            // Empty files are skipped silently (§8 boundary behavior): no
            // violation, no diagnostic.
            continue;
        }

        let language = match infer_language(&path) {
            Some(lang) => lang,
            None => {
                skipped.push(SkippedFile {
                    path: relative,
                    kind: DiagnosticKind::SkippedUnknownLanguage,
                    message: "no recognized extension or shebang".to_string(),
                });
                continue;
            }
        };

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(err) => {
                skipped.push(SkippedFile {
                    path: relative,
                    kind: DiagnosticKind::SkippedUnreadable,
                    message: err.to_string(),
                });
                continue;
            }
        };

        let content_hash = content_hash_hex(&bytes);

        files.push(SourceFile {
            path: path.clone(),
            relative_path: relative,
            language,
            content_hash,
            size_bytes: metadata.len(),
        });
    }

    info!(count = files.len(), skipped = skipped.len(), "file discovery complete");
    Ok(DiscoveryResult { files, skipped })
}

fn push_unique(
    seen: &mut HashSet<PathBuf>,
    collected: &mut Vec<(PathBuf, PathBuf)>,
    canonical: PathBuf,
    base: PathBuf,
) {
    if seen.insert(canonical.clone()) {
        collected.push((canonical, base));
    }
}

fn compile_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|err| CoreError::policy_invalid(format!("invalid glob '{pattern}': {err}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|err| CoreError::policy_invalid(format!("failed to build glob set: {err}")))
}

fn infer_language(path: &Path) -> Option<Language> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let Some(lang) = Language::from_extension(ext) {
            return Some(lang);
        }
    }

    // Shebang fallback for extensionless scripts (§4.1 rule 4).
    let mut file = fs::File::open(path).ok()?;
    let mut buf = [0u8; 256];
    let n = file.read(&mut buf).ok()?;
    let first_line = String::from_utf8_lossy(&buf[..n]);
    let first_line = first_line.lines().next().unwrap_or("");
    Language::from_shebang(first_line)
}

fn content_hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    // Truncate to 128 bits (16 bytes) per §3.
    hex_encode(&digest[..16])
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discovers_and_orders_files_deterministically() {
        let dir = tempdir().unwrap();
        for name in ["b.py", "a.py", "c.py"] {
            let mut f = fs::File::create(dir.path().join(name)).unwrap();
            writeln!(f, "def f(): pass").unwrap();
        }
        let result = discover(&[dir.path().to_path_buf()], &DiscoveryOptions::default()).unwrap();
        assert_eq!(result.files.len(), 3);
        let paths: Vec<_> = result.files.iter().map(|f| f.relative_path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn missing_root_is_fatal() {
        let result = discover(&[PathBuf::from("/no/such/path")], &DiscoveryOptions::default());
        assert!(matches!(result, Err(CoreError::InputNotFound { .. })));
    }

    #[test]
    fn empty_file_is_skipped_silently() {
        let dir = tempdir().unwrap();
        fs::File::create(dir.path().join("empty.py")).unwrap();
        let result = discover(&[dir.path().to_path_buf()], &DiscoveryOptions::default()).unwrap();
        assert!(result.files.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn oversized_file_is_skipped_with_diagnostic() {
        let dir = tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("big.py")).unwrap();
        f.write_all(&vec![b'x'; 100]).unwrap();
        let options = DiscoveryOptions {
            max_file_size_bytes: 10,
            ..Default::default()
        };
        let result = discover(&[dir.path().to_path_buf()], &options).unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert!(matches!(result.skipped[0].kind, DiagnosticKind::SkippedTooLarge));
    }
}
