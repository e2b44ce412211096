//! Go language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_declaration"],
    method_kinds: &["method_declaration"],
    class_kinds: &["type_declaration"],
    call_kinds: &["call_expression"],
    parameter_kinds: &["parameter_declaration", "variadic_parameter_declaration"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["interpreted_string_literal", "raw_string_literal"],
    number_literal_kinds: &["int_literal", "float_literal"],
    import_kinds: &["import_declaration"],
    assignment_kinds: &["assignment_statement"],
    comment_kinds: &["comment"],
    sleep_call_names: &["time.Sleep"],
    name_field: "name",
    params_field: "parameters",
    body_field: "body",
};

pub struct GoAdapter;

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_go::LANGUAGE.into();
        parse_source(lang, Language::Go, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_declaration() {
        let adapter = GoAdapter;
        let ast = adapter
            .parse("package main\n\nfunc add(a int, b int) int {\n\treturn a + b\n}\n")
            .unwrap();
        let entities = adapter.extract_entities(&ast);
        assert_eq!(entities.len(), 1);
    }
}
