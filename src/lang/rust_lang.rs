//! Rust language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_item"],
    method_kinds: &[],
    class_kinds: &["struct_item", "impl_item", "trait_item"],
    call_kinds: &["call_expression"],
    parameter_kinds: &["parameter", "self_parameter"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string_literal"],
    number_literal_kinds: &["integer_literal", "float_literal"],
    import_kinds: &["use_declaration"],
    assignment_kinds: &["assignment_expression"],
    comment_kinds: &["line_comment", "block_comment"],
    sleep_call_names: &["thread::sleep", "sleep"],
    name_field: "name",
    params_field: "parameters",
    body_field: "body",
};

pub struct RustAdapter;

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_rust::LANGUAGE.into();
        parse_source(lang, Language::Rust, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_item() {
        let adapter = RustAdapter;
        let ast = adapter.parse("fn add(a: i32, b: i32) -> i32 { a + b }\n").unwrap();
        let entities = adapter.extract_entities(&ast);
        assert_eq!(entities.len(), 1);
    }
}
