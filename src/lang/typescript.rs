//! TypeScript language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_declaration", "function_expression", "arrow_function"],
    method_kinds: &["method_definition", "method_signature"],
    class_kinds: &["class_declaration"],
    call_kinds: &["call_expression"],
    parameter_kinds: &[
        "identifier",
        "required_parameter",
        "optional_parameter",
        "assignment_pattern",
    ],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string", "template_string"],
    number_literal_kinds: &["number"],
    import_kinds: &["import_statement"],
    assignment_kinds: &["assignment_expression"],
    comment_kinds: &["comment"],
    sleep_call_names: &["setTimeout", "sleep"],
    name_field: "name",
    params_field: "parameters",
    body_field: "body",
};

pub struct TypeScriptAdapter;

impl LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> Language {
        Language::Typescript
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        parse_source(lang, Language::Typescript, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_function() {
        let adapter = TypeScriptAdapter;
        let ast = adapter
            .parse("function add(a: number, b: number): number { return a + b; }\n")
            .unwrap();
        let entities = adapter.extract_entities(&ast);
        assert_eq!(entities.len(), 1);
        assert!(entities[0].return_annotated);
        assert!(entities[0].params.iter().all(|p| p.annotated));
    }
}
