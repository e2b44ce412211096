//! C language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_definition"],
    method_kinds: &[],
    class_kinds: &["struct_specifier"],
    call_kinds: &["call_expression"],
    parameter_kinds: &["parameter_declaration"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string_literal"],
    number_literal_kinds: &["number_literal"],
    import_kinds: &["preproc_include"],
    assignment_kinds: &["assignment_expression"],
    comment_kinds: &["comment"],
    sleep_call_names: &["sleep", "usleep", "nanosleep"],
    name_field: "declarator",
    params_field: "parameters",
    body_field: "body",
};

pub struct CAdapter;

impl LanguageAdapter for CAdapter {
    fn language(&self) -> Language {
        Language::C
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_c::LANGUAGE.into();
        parse_source(lang, Language::C, source)
    }
}
