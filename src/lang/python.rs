//! Python language adapter.

use tree_sitter::Language as TsLanguage;

use super::common::{parse_source, LanguageAdapter, NodeKinds};
use crate::ast::Ast;
use crate::errors::Result;
use crate::model::Language;

static NODE_KINDS: NodeKinds = NodeKinds {
    function_kinds: &["function_definition"],
    method_kinds: &[],
    class_kinds: &["class_definition"],
    call_kinds: &["call"],
    parameter_kinds: &["identifier", "typed_parameter", "default_parameter", "typed_default_parameter"],
    identifier_kinds: &["identifier"],
    string_literal_kinds: &["string"],
    number_literal_kinds: &["integer", "float"],
    import_kinds: &["import_statement", "import_from_statement"],
    assignment_kinds: &["assignment"],
    comment_kinds: &["comment"],
    sleep_call_names: &["sleep", "time.sleep", "asyncio.sleep"],
    name_field: "name",
    params_field: "parameters",
    body_field: "body",
};

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn node_kinds(&self) -> &'static NodeKinds {
        &NODE_KINDS
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        let lang: TsLanguage = tree_sitter_python::LANGUAGE.into();
        parse_source(lang, Language::Python, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_module() {
        let adapter = PythonAdapter;
        let ast = adapter.parse("def f(a, b):\n    return a + b\n").unwrap();
        let entities = adapter.extract_entities(&ast);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].params.len(), 2);
    }
}
