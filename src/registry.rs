//! Detector Registry (§4.4 C4): a static table of detector descriptors plus
//! the filtering logic that resolves which detectors run for a given
//! (language, policy) pair.
//!
//! Grounded on the teacher's `src/lang/registry.rs` (`REGISTERED_LANGUAGES`,
//! a const slice of per-language metadata resolved at call sites) and
//! `Zach-hammad-repotoire`'s `src/detectors/mod.rs` static-registration
//! pattern. Registration is static per process: adding a detector means
//! shipping code, never runtime plugin loading (§4.4 contract).

use crate::detectors::clarity::ClarityDetector;
use crate::detectors::connascence::{
    AlgorithmDetector, ExecutionDetector, IdentityDetector, MeaningDetector, NameDetector,
    PositionDetector, TimingDetector, TypeDetector, ValueDetector,
};
use crate::detectors::duplication::DuplicationDetector;
use crate::detectors::god_object::GodObjectDetector;
use crate::detectors::nasa::NasaDetector;
use crate::detectors::Detector;
use crate::model::{Language, ViolationKind};
use crate::policy::PolicyView;

/// Static metadata describing one detector, independent of its
/// implementation — used by `enabled_detectors_for` to filter without
/// instantiating detectors that won't run.
#[derive(Debug, Clone, Copy)]
pub struct DetectorDescriptor {
    pub detector_id: &'static str,
    pub supported_languages: Option<&'static [Language]>,
    pub kind: ViolationKind,
    pub rule_ids: &'static [&'static str],
    pub requires_context: bool,
}

/// `None` supported_languages means "all eight languages".
pub const DESCRIPTORS: &[DetectorDescriptor] = &[
    DetectorDescriptor {
        detector_id: "connascence.name",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoN-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.type",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoT-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.meaning",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoM-001"],
        requires_context: true,
    },
    DetectorDescriptor {
        detector_id: "connascence.position",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoP-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.algorithm",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoA-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.execution",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoE-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.timing",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoTi-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.value",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoV-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "connascence.identity",
        supported_languages: None,
        kind: ViolationKind::Connascence,
        rule_ids: &["CoI-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "god_object",
        supported_languages: None,
        kind: ViolationKind::Structural,
        rule_ids: &["GOD-001"],
        requires_context: true,
    },
    DetectorDescriptor {
        detector_id: "nasa",
        supported_languages: None,
        kind: ViolationKind::Nasa,
        rule_ids: &[
            "NASA-1", "NASA-2", "NASA-3", "NASA-4", "NASA-5", "NASA-6", "NASA-7", "NASA-8",
            "NASA-9", "NASA-10",
        ],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "duplication",
        supported_languages: None,
        kind: ViolationKind::Duplication,
        rule_ids: &["DUP-001"],
        requires_context: false,
    },
    DetectorDescriptor {
        detector_id: "clarity",
        supported_languages: None,
        kind: ViolationKind::Clarity,
        rule_ids: &["CLR-001"],
        requires_context: false,
    },
];

/// Construct the detector instance matching a descriptor. Kept separate from
/// `DESCRIPTORS` so the metadata table stays `const`-eligible.
fn instantiate(detector_id: &str) -> Box<dyn Detector> {
    match detector_id {
        "connascence.name" => Box::new(NameDetector),
        "connascence.type" => Box::new(TypeDetector),
        "connascence.meaning" => Box::new(MeaningDetector),
        "connascence.position" => Box::new(PositionDetector),
        "connascence.algorithm" => Box::new(AlgorithmDetector),
        "connascence.execution" => Box::new(ExecutionDetector),
        "connascence.timing" => Box::new(TimingDetector),
        "connascence.value" => Box::new(ValueDetector),
        "connascence.identity" => Box::new(IdentityDetector),
        "god_object" => Box::new(GodObjectDetector),
        "nasa" => Box::new(NasaDetector),
        "duplication" => Box::new(DuplicationDetector),
        "clarity" => Box::new(ClarityDetector),
        other => unreachable!("no detector registered under id '{other}'"),
    }
}

/// Resolve the enabled detectors for `language` under `policy_view`, in
/// `DESCRIPTORS` registration order (the order the Orchestrator runs them
/// within one file, per §4.6's ordering guarantee).
pub fn enabled_detectors_for(language: Language, policy_view: &PolicyView) -> Vec<Box<dyn Detector>> {
    DESCRIPTORS
        .iter()
        .filter(|d| d.supported_languages.map(|langs| langs.contains(&language)).unwrap_or(true))
        .filter(|d| d.rule_ids.iter().any(|rule_id| policy_view.is_rule_enabled(rule_id)))
        .map(|d| instantiate(d.detector_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    #[test]
    fn every_language_gets_the_full_detector_set() {
        let policy = Policy::load("service-defaults", None, Vec::new()).unwrap();
        let view = policy.view_for("src/a.py");
        for language in Language::ALL {
            let detectors = enabled_detectors_for(language, &view);
            assert_eq!(detectors.len(), DESCRIPTORS.len());
        }
    }

    #[test]
    fn disabling_all_rule_ids_for_a_detector_drops_it() {
        let override_doc = "rules:\n  CoN-001:\n    enabled: false\n";
        let policy = Policy::load("service-defaults", Some(override_doc), Vec::new()).unwrap();
        let view = policy.view_for("src/a.py");
        let detectors = enabled_detectors_for(Language::Python, &view);
        assert!(!detectors.iter().any(|d| d.id() == "connascence.name"));
    }
}
