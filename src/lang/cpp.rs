//! C++ language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_definition"],
    method_kinds: &[],
    class_kinds: &["class_specifier", "struct_specifier"],
    call_kinds: &["call_expression"],
    parameter_kinds: &["parameter_declaration"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string_literal"],
    number_literal_kinds: &["number_literal"],
    import_kinds: &["preproc_include"],
    assignment_kinds: &["assignment_expression"],
    comment_kinds: &["comment"],
    sleep_call_names: &["sleep", "usleep", "std::this_thread::sleep_for"],
    name_field: "declarator",
    params_field: "parameters",
    body_field: "body",
};

pub struct CppAdapter;

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_cpp::LANGUAGE.into();
        parse_source(lang, Language::Cpp, source)
    }
}
