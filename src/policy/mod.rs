//! Policy Engine (§4.3 C3): loads preset + override + waiver configuration
//! and resolves a per-file `PolicyView`.
//!
//! Grounded on the teacher's `core/config.rs` `ValknutConfig`: a serde struct
//! composed of sub-structs, deserializable from YAML/TOML/JSON, with
//! compiled-in defaults so the crate never requires a config file on disk.
//! Presets are embedded via `include_str!` rather than shipped as runtime
//! files, matching `ValknutConfig::default()`'s self-contained defaults.

pub mod waivers;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{CoreError, Result};
use crate::model::{Diagnostic, DiagnosticKind, Severity, Violation};

pub use waivers::Waiver;

const PRESET_STRICT_CORE: &str = include_str!("presets/strict-core.yaml");
const PRESET_SERVICE_DEFAULTS: &str = include_str!("presets/service-defaults.yaml");
const PRESET_EXPERIMENTAL: &str = include_str!("presets/experimental.yaml");
const PRESET_NASA_JPL_POT10: &str = include_str!("presets/nasa-jpl-pot10.yaml");
const PRESET_MODERN_GENERAL: &str = include_str!("presets/modern-general.yaml");

/// The five preset names accepted by §4.3's `preset_name` option.
pub const PRESET_NAMES: [&str; 5] = [
    "strict-core",
    "service-defaults",
    "experimental",
    "nasa-jpl-pot10",
    "modern-general",
];

fn preset_source(name: &str) -> Option<&'static str> {
    match name {
        "strict-core" => Some(PRESET_STRICT_CORE),
        "service-defaults" => Some(PRESET_SERVICE_DEFAULTS),
        "experimental" => Some(PRESET_EXPERIMENTAL),
        "nasa-jpl-pot10" => Some(PRESET_NASA_JPL_POT10),
        "modern-general" => Some(PRESET_MODERN_GENERAL),
        _ => None,
    }
}

/// The numeric/threshold options named in §4.3's option table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub max_function_lines: u32,
    pub max_cyclomatic_complexity: u32,
    pub max_parameters: u32,
    pub max_nesting_depth: u32,
    pub god_object_method_threshold: u32,
    pub god_object_loc_threshold: u32,
    pub god_object_cohesion_floor: f64,
    pub magic_literal_allowlist: BTreeSet<String>,
    pub duplication_min_lines: u32,
    pub duplication_similarity_threshold: f64,
}

/// Sparse per-profile overrides: any field left `None` inherits the global
/// `ThresholdSet` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    pub max_function_lines: Option<u32>,
    pub max_cyclomatic_complexity: Option<u32>,
    pub max_parameters: Option<u32>,
    pub max_nesting_depth: Option<u32>,
    pub god_object_method_threshold: Option<u32>,
    pub god_object_loc_threshold: Option<u32>,
    pub god_object_cohesion_floor: Option<f64>,
    pub magic_literal_allowlist: Option<BTreeSet<String>>,
    pub duplication_min_lines: Option<u32>,
    pub duplication_similarity_threshold: Option<f64>,
}

impl ThresholdSet {
    fn merged_with(&self, overrides: &ThresholdOverrides) -> ThresholdSet {
        ThresholdSet {
            max_function_lines: overrides.max_function_lines.unwrap_or(self.max_function_lines),
            max_cyclomatic_complexity: overrides
                .max_cyclomatic_complexity
                .unwrap_or(self.max_cyclomatic_complexity),
            max_parameters: overrides.max_parameters.unwrap_or(self.max_parameters),
            max_nesting_depth: overrides.max_nesting_depth.unwrap_or(self.max_nesting_depth),
            god_object_method_threshold: overrides
                .god_object_method_threshold
                .unwrap_or(self.god_object_method_threshold),
            god_object_loc_threshold: overrides
                .god_object_loc_threshold
                .unwrap_or(self.god_object_loc_threshold),
            god_object_cohesion_floor: overrides
                .god_object_cohesion_floor
                .unwrap_or(self.god_object_cohesion_floor),
            magic_literal_allowlist: overrides
                .magic_literal_allowlist
                .clone()
                .unwrap_or_else(|| self.magic_literal_allowlist.clone()),
            duplication_min_lines: overrides
                .duplication_min_lines
                .unwrap_or(self.duplication_min_lines),
            duplication_similarity_threshold: overrides
                .duplication_similarity_threshold
                .unwrap_or(self.duplication_similarity_threshold),
        }
    }
}

/// Per-rule enable flag and optional severity floor (§4.3's `rules` map).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub severity_floor: Option<Severity>,
}

fn default_true() -> bool {
    true
}

/// A glob pattern assigning files to a profile name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobProfile {
    pub glob: String,
    pub profile: String,
}

/// The raw, serde-deserializable policy document (§3 `Policy`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_preset_name")]
    pub preset_name: String,
    pub thresholds: ThresholdSet,
    #[serde(default)]
    pub profiles: BTreeMap<String, ThresholdOverrides>,
    #[serde(default = "default_file_profile_map")]
    pub file_profile_map: Vec<GlobProfile>,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    #[serde(default)]
    pub waivers: Vec<Waiver>,
    /// Optional per-severity count ceilings (§3 `Policy.budgets`); absent by
    /// default in every shipped preset, so only `fail_on` gates the budget
    /// check until a caller opts in via an override document.
    #[serde(default)]
    pub budgets: BTreeMap<String, usize>,
}

fn default_preset_name() -> String {
    "modern-general".to_string()
}

fn default_fail_on() -> Severity {
    Severity::High
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

/// Critical profile defaults from the Glossary's own examples (SPEC_FULL §9).
fn default_file_profile_map() -> Vec<GlobProfile> {
    vec![
        GlobProfile { glob: "security/**".to_string(), profile: "critical".to_string() },
        GlobProfile { glob: "**/security/**".to_string(), profile: "critical".to_string() },
        GlobProfile { glob: "auth/**".to_string(), profile: "critical".to_string() },
        GlobProfile { glob: "**/auth/**".to_string(), profile: "critical".to_string() },
        GlobProfile { glob: "**/experimental/**".to_string(), profile: "experimental".to_string() },
        GlobProfile { glob: "**/prototype/**".to_string(), profile: "experimental".to_string() },
        GlobProfile { glob: "**/tests/**".to_string(), profile: "test".to_string() },
        GlobProfile { glob: "**/test/**".to_string(), profile: "test".to_string() },
        GlobProfile { glob: "**/*_test.*".to_string(), profile: "test".to_string() },
        GlobProfile { glob: "**/test_*.*".to_string(), profile: "test".to_string() },
    ]
}

impl Policy {
    /// Load a named preset, deep-merge an optional override document (YAML,
    /// TOML, or JSON text, format sniffed), and attach waivers.
    ///
    /// Mirrors §4.3's `load(preset_name, override_config, waiver_list)`.
    pub fn load(preset_name: &str, override_source: Option<&str>, waivers: Vec<Waiver>) -> Result<Policy> {
        let preset_yaml = preset_source(preset_name)
            .ok_or_else(|| CoreError::policy_not_found(preset_name.to_string()))?;

        let mut base: serde_yaml::Value = serde_yaml::from_str(preset_yaml)
            .map_err(|err| CoreError::policy_invalid(format!("built-in preset '{preset_name}' failed to parse: {err}")))?;

        if let Some(source) = override_source {
            let overrides = parse_any_format(source)?;
            deep_merge(&mut base, &overrides);
        }

        let mut policy: Policy = serde_yaml::from_value(base)
            .map_err(|err| CoreError::policy_invalid(format!("merged policy document is invalid: {err}")))?;

        policy.preset_name = preset_name.to_string();
        policy.waivers = waivers;
        Ok(policy)
    }

    /// Load a policy from a file on disk: preset name, or a path to a
    /// YAML/TOML/JSON document. Matches §6's `load_policy`.
    pub fn load_from(preset_name_or_path: &str) -> Result<Policy> {
        let path = Path::new(preset_name_or_path);
        if path.exists() {
            let text = std::fs::read_to_string(path)?;
            let value = parse_any_format(&text)?;
            let preset_name = value
                .get("preset_name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(default_preset_name);
            let base_yaml = preset_source(&preset_name)
                .ok_or_else(|| CoreError::policy_not_found(preset_name.clone()))?;
            let mut base: serde_yaml::Value = serde_yaml::from_str(base_yaml)
                .map_err(|err| CoreError::policy_invalid(format!("built-in preset '{preset_name}' failed to parse: {err}")))?;
            deep_merge(&mut base, &value);
            let mut policy: Policy = serde_yaml::from_value(base)
                .map_err(|err| CoreError::policy_invalid(format!("policy file '{preset_name_or_path}' is invalid: {err}")))?;
            policy.preset_name = preset_name;
            Ok(policy)
        } else {
            Policy::load(preset_name_or_path, None, Vec::new())
        }
    }

    /// Resolve the effective thresholds/rules for `file_path` (§4.3
    /// `view_for`). Identical inputs always resolve identically.
    pub fn view_for(&self, file_path: &str) -> PolicyView {
        let profile = self.profile_for(file_path);
        let thresholds = match self.profiles.get(&profile) {
            Some(overrides) => self.thresholds.merged_with(overrides),
            None => self.thresholds.clone(),
        };

        PolicyView {
            profile,
            thresholds,
            rules: self.rules.clone(),
            severity_overrides: self.severity_overrides.clone(),
            fail_on: self.fail_on,
        }
    }

    fn profile_for(&self, file_path: &str) -> String {
        for entry in &self.file_profile_map {
            if let Ok(glob) = Glob::new(&entry.glob) {
                let matcher: GlobMatcher = glob.compile_matcher();
                if matcher.is_match(file_path) {
                    return entry.profile.clone();
                }
            } else {
                warn!(glob = %entry.glob, "invalid file_profile_map glob, skipping");
            }
        }
        "general".to_string()
    }

    /// Determine whether `violation` is covered by an active (non-expired)
    /// waiver, per §4.3's `is_waived`. An expired waiver returns `false`
    /// plus a `WaiverExpired` diagnostic.
    pub fn is_waived(&self, violation: &Violation, today: chrono::NaiveDate) -> (bool, Option<Diagnostic>) {
        for waiver in &self.waivers {
            if waiver.rule_id != violation.rule_id {
                continue;
            }
            let Ok(glob) = Glob::new(&waiver.path_pattern) else {
                continue;
            };
            if !glob.compile_matcher().is_match(&violation.file_path) {
                continue;
            }
            if let Some(expires_on) = waiver.expires_on {
                if expires_on < today {
                    return (
                        false,
                        Some(Diagnostic {
                            kind: DiagnosticKind::WaiverExpired,
                            file_path: Some(violation.file_path.clone()),
                            message: format!(
                                "waiver for rule {} on {} expired on {}",
                                waiver.rule_id, waiver.path_pattern, expires_on
                            ),
                        }),
                    );
                }
            }
            return (true, None);
        }
        (false, None)
    }
}

/// The resolved view handed to every detector invocation for one file
/// (§4.3 `view_for` return value, referenced from `AnalysisContext`).
#[derive(Debug, Clone)]
pub struct PolicyView {
    pub profile: String,
    pub thresholds: ThresholdSet,
    pub rules: BTreeMap<String, RuleConfig>,
    pub severity_overrides: BTreeMap<String, Severity>,
    pub fail_on: Severity,
}

impl PolicyView {
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.rules.get(rule_id).map(|r| r.enabled).unwrap_or(true)
    }

    pub fn severity_floor(&self, rule_id: &str) -> Option<Severity> {
        self.rules.get(rule_id).and_then(|r| r.severity_floor)
    }

    /// Apply any configured `severity_overrides` entry, then any rule-level
    /// floor, raising `base` but never lowering it.
    pub fn resolve_severity(&self, rule_id: &str, base: Severity) -> Severity {
        let mut severity = base;
        if let Some(&overridden) = self.severity_overrides.get(rule_id) {
            severity = overridden;
        }
        if let Some(floor) = self.severity_floor(rule_id) {
            if floor > severity {
                severity = floor;
            }
        }
        severity
    }
}

fn parse_any_format(source: &str) -> Result<serde_yaml::Value> {
    if let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(source) {
        return Ok(value);
    }
    if let Ok(toml_value) = toml::from_str::<toml::Value>(source) {
        return toml_to_yaml(toml_value);
    }
    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(source) {
        return Ok(json_to_yaml(json_value));
    }
    Err(CoreError::policy_invalid(
        "override document is not valid YAML, TOML, or JSON".to_string(),
    ))
}

fn toml_to_yaml(value: toml::Value) -> Result<serde_yaml::Value> {
    let json = serde_json::to_value(value)
        .map_err(|err| CoreError::policy_invalid(format!("TOML to JSON conversion failed: {err}")))?;
    Ok(json_to_yaml(json))
}

fn json_to_yaml(value: serde_json::Value) -> serde_yaml::Value {
    serde_yaml::to_value(value).unwrap_or(serde_yaml::Value::Null)
}

/// Recursive deep merge: `overlay` wins on scalar conflicts, mappings merge
/// key-by-key, everything else (including sequences) is replaced wholesale.
fn deep_merge(base: &mut serde_yaml::Value, overlay: &serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_every_named_preset() {
        for name in PRESET_NAMES {
            let policy = Policy::load(name, None, Vec::new()).unwrap();
            assert_eq!(policy.preset_name, name);
        }
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let result = Policy::load("not-a-real-preset", None, Vec::new());
        assert!(matches!(result, Err(CoreError::PolicyNotFound { .. })));
    }

    #[test]
    fn override_narrows_threshold_without_touching_siblings() {
        let policy = Policy::load(
            "service-defaults",
            Some("thresholds:\n  max_parameters: 2\n"),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(policy.thresholds.max_parameters, 2);
        assert_eq!(policy.thresholds.max_function_lines, 60);
    }

    #[test]
    fn security_path_resolves_to_critical_profile() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let view = policy.view_for("security/auth_check.py");
        assert_eq!(view.profile, "critical");
        assert!(view.thresholds.max_parameters < policy.thresholds.max_parameters);
    }

    #[test]
    fn general_profile_is_the_fallback() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let view = policy.view_for("src/widgets/button.py");
        assert_eq!(view.profile, "general");
        assert_eq!(view.thresholds, policy.thresholds);
    }

    #[test]
    fn expired_waiver_is_inactive_with_diagnostic() {
        let waiver = Waiver {
            rule_id: "CoP-001".to_string(),
            path_pattern: "src/legacy/**".to_string(),
            expires_on: Some(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            justification: "grandfathered".to_string(),
        };
        let policy = Policy::load("service-defaults", None, vec![waiver]).unwrap();
        let violation = Violation {
            rule_id: "CoP-001".to_string(),
            kind: crate::model::ViolationKind::Connascence,
            connascence_type: Some(crate::model::ConnascenceType::Position),
            severity: Severity::Medium,
            file_path: "src/legacy/old.py".to_string(),
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 1,
            description: "too many positional args".to_string(),
            recommendation: None,
            snippet: None,
            fingerprint: "abc".to_string(),
            context: Default::default(),
        };
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let (waived, diagnostic) = policy.is_waived(&violation, today);
        assert!(!waived);
        assert!(matches!(
            diagnostic.unwrap().kind,
            DiagnosticKind::WaiverExpired
        ));
    }

    #[test]
    fn active_waiver_suppresses_violation() {
        let waiver = Waiver {
            rule_id: "CoP-001".to_string(),
            path_pattern: "src/legacy/**".to_string(),
            expires_on: Some(chrono::NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()),
            justification: "tracked in TICKET-123".to_string(),
        };
        let policy = Policy::load("service-defaults", None, vec![waiver]).unwrap();
        let violation = Violation {
            rule_id: "CoP-001".to_string(),
            kind: crate::model::ViolationKind::Connascence,
            connascence_type: Some(crate::model::ConnascenceType::Position),
            severity: Severity::Medium,
            file_path: "src/legacy/old.py".to_string(),
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 1,
            description: "too many positional args".to_string(),
            recommendation: None,
            snippet: None,
            fingerprint: "abc".to_string(),
            context: Default::default(),
        };
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let (waived, diagnostic) = policy.is_waived(&violation, today);
        assert!(waived);
        assert!(diagnostic.is_none());
    }
}
