//! Class-context classifier (§4.5.3): labels a class-like entity with the
//! semantic role that drives context-aware thresholds and suppression.
//!
//! Grounded on `Zach-hammad-repotoire`'s `src/detectors/base.rs` pattern of
//! an ordered-rule classifier feeding detector decisions, adapted to the
//! nine-category enum spec.md names explicitly.

use serde::{Deserialize, Serialize};

use crate::lang::common::Entity;

/// The nine class-context categories (§4.5.3 output set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassContext {
    Config,
    DataModel,
    ApiController,
    Utility,
    BusinessLogic,
    Framework,
    Test,
    Infrastructure,
    Unknown,
}

impl ClassContext {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassContext::Config => "CONFIG",
            ClassContext::DataModel => "DATA_MODEL",
            ClassContext::ApiController => "API_CONTROLLER",
            ClassContext::Utility => "UTILITY",
            ClassContext::BusinessLogic => "BUSINESS_LOGIC",
            ClassContext::Framework => "FRAMEWORK",
            ClassContext::Test => "TEST",
            ClassContext::Infrastructure => "INFRASTRUCTURE",
            ClassContext::Unknown => "UNKNOWN",
        }
    }
}

const HTTP_ROUTE_DECORATORS: &[&str] = &[
    "route", "get", "post", "put", "delete", "patch", "app.route", "router.get",
    "router.post", "RequestMapping", "GetMapping", "PostMapping",
];

const FRAMEWORK_BASE_NAMESPACES: &[&str] = &[
    "django.", "flask.", "rest_framework.", "sqlalchemy.", "pydantic.",
    "react.", "vue.", "spring.", "actix_web::", "axum::",
];

/// Classify a class/struct-like `Entity` per the eight ordered rules.
///
/// `file_path` is the entity's containing file, relative to the project
/// root; `methods` are the class's direct method entities.
pub fn classify(entity: &Entity, methods: &[&Entity], file_path: &str) -> ClassContext {
    let name = entity.name.as_str();

    // Rule 1: test.
    if is_test_path(file_path) || name.ends_with("Test") || name.ends_with("Tests") {
        return ClassContext::Test;
    }

    // Rule 2: API controller.
    let has_route_decorator = entity
        .decorators
        .iter()
        .any(|d| HTTP_ROUTE_DECORATORS.iter().any(|marker| d.contains(marker)));
    if has_route_decorator
        || name.ends_with("Controller")
        || name.ends_with("Handler")
        || name.ends_with("View")
    {
        return ClassContext::ApiController;
    }

    // Rule 3: data model.
    if entity
        .base_classes
        .iter()
        .any(|base| base.contains("Model") || base.contains("Entity") || base == "BaseModel")
    {
        return ClassContext::DataModel;
    }

    // Rule 4: config.
    let accessor_ratio = trivial_accessor_ratio(methods);
    if name.ends_with("Config") || name.ends_with("Settings") || name.ends_with("Options") || accessor_ratio > 0.70
    {
        return ClassContext::Config;
    }

    // Rule 5: infrastructure.
    if name.ends_with("Repository")
        || name.ends_with("Gateway")
        || name.ends_with("Client")
        || name.ends_with("Connection")
    {
        return ClassContext::Infrastructure;
    }

    // Rule 6: utility.
    let all_static = !methods.is_empty() && methods.iter().all(|m| is_static_like(m));
    if name.ends_with("Util") || name.ends_with("Utils") || name.ends_with("Helper") || all_static {
        return ClassContext::Utility;
    }

    // Rule 7: framework.
    if entity
        .base_classes
        .iter()
        .any(|base| FRAMEWORK_BASE_NAMESPACES.iter().any(|ns| base.starts_with(ns)))
    {
        return ClassContext::Framework;
    }

    // Rule 8: business logic vs unknown.
    let has_state = !entity.base_classes.is_empty() || !methods.is_empty();
    if has_state && !methods.is_empty() {
        ClassContext::BusinessLogic
    } else {
        ClassContext::Unknown
    }
}

fn is_test_path(file_path: &str) -> bool {
    let lowered = file_path.replace('\\', "/");
    lowered.contains("tests/")
        || lowered.contains("/test/")
        || lowered.starts_with("test/")
        || lowered.contains("_test.")
        || lowered.contains("test_")
}

fn trivial_accessor_ratio(methods: &[&Entity]) -> f64 {
    if methods.is_empty() {
        return 0.0;
    }
    let trivial = methods.iter().filter(|m| m.is_trivial_accessor()).count();
    trivial as f64 / methods.len() as f64
}

fn is_static_like(method: &Entity) -> bool {
    method
        .decorators
        .iter()
        .any(|d| d.contains("staticmethod") || d.contains("static"))
        || method.params.first().map(|p| p.name != "self" && p.name != "this").unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::common::{Entity, EntityKind, ParamInfo};
    use crate::model::Span;

    fn entity(name: &str, kind: EntityKind) -> Entity {
        Entity {
            id: name.to_string(),
            kind,
            name: name.to_string(),
            span: Span::point(1, 1),
            parent_class: None,
            base_classes: Vec::new(),
            params: Vec::new(),
            return_annotated: false,
            has_doc: false,
            body_text: String::new(),
            decorators: Vec::new(),
        }
    }

    #[test]
    fn test_suffix_wins_even_with_config_suffix() {
        let e = entity("DbConfigTests", EntityKind::Class);
        assert_eq!(classify(&e, &[], "tests/test_db.py"), ClassContext::Test);
    }

    #[test]
    fn controller_suffix_is_detected() {
        let e = entity("UserController", EntityKind::Class);
        assert_eq!(classify(&e, &[], "src/api/user.py"), ClassContext::ApiController);
    }

    #[test]
    fn trivial_accessor_heavy_class_is_config() {
        let class = entity("DbConfig", EntityKind::Class);
        let mut getters = Vec::new();
        for i in 0..28 {
            let mut m = entity(&format!("get_field_{i}"), EntityKind::Method);
            m.body_text = "return self._value".to_string();
            getters.push(m);
        }
        let refs: Vec<&Entity> = getters.iter().collect();
        assert_eq!(classify(&class, &refs, "src/config.py"), ClassContext::Config);
    }

    #[test]
    fn repository_suffix_is_infrastructure() {
        let e = entity("UserRepository", EntityKind::Class);
        assert_eq!(classify(&e, &[], "src/db/user.py"), ClassContext::Infrastructure);
    }

    #[test]
    fn plain_class_with_methods_is_business_logic() {
        let class = entity("OrderProcessor", EntityKind::Class);
        let method = entity("process", EntityKind::Method);
        let refs = vec![&method];
        assert_eq!(classify(&class, &refs, "src/orders.py"), ClassContext::BusinessLogic);
    }

    #[test]
    fn empty_class_with_no_base_is_unknown() {
        let class = entity("Marker", EntityKind::Class);
        assert_eq!(classify(&class, &[], "src/marker.py"), ClassContext::Unknown);
    }
}
