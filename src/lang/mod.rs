//! Language adapters: one per supported `Language`, each wiring a
//! tree-sitter grammar and its node-kind vocabulary into the generic entity
//! extractor in [`common`].

pub mod c;
pub mod common;
pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust_lang;
pub mod typescript;

pub use common::{Entity, EntityKind, LanguageAdapter, NodeKinds, ParamInfo};

use crate::model::Language;

/// Construct the adapter for a given language.
pub fn adapter_for(language: Language) -> Box<dyn LanguageAdapter> {
    match language {
        Language::Python => Box::new(python::PythonAdapter),
        Language::Javascript => Box::new(javascript::JavaScriptAdapter),
        Language::Typescript => Box::new(typescript::TypeScriptAdapter),
        Language::C => Box::new(c::CAdapter),
        Language::Cpp => Box::new(cpp::CppAdapter),
        Language::Java => Box::new(java::JavaAdapter),
        Language::Go => Box::new(go::GoAdapter),
        Language::Rust => Box::new(rust_lang::RustAdapter),
    }
}
