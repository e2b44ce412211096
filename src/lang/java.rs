//! Java language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &[],
    method_kinds: &["method_declaration", "constructor_declaration"],
    class_kinds: &["class_declaration", "interface_declaration"],
    call_kinds: &["method_invocation"],
    parameter_kinds: &["formal_parameter"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string_literal"],
    number_literal_kinds: &["decimal_integer_literal", "decimal_floating_point_literal"],
    import_kinds: &["import_declaration"],
    assignment_kinds: &["assignment_expression"],
    comment_kinds: &["line_comment", "block_comment"],
    sleep_call_names: &["Thread.sleep"],
    name_field: "name",
    params_field: "parameters",
    body_field: "body",
};

pub struct JavaAdapter;

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_java::LANGUAGE.into();
        parse_source(lang, Language::Java, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_declaration() {
        let adapter = JavaAdapter;
        let ast = adapter
            .parse("class Calc {\n  int add(int a, int b) {\n    return a + b;\n  }\n}\n")
            .unwrap();
        let entities = adapter.extract_entities(&ast);
        assert!(entities.iter().any(|e| e.name == "add"));
    }
}
