//! Shared AST abstractions used by every language adapter: a generic entity
//! extractor driven by a per-language table of tree-sitter node kind names,
//! plus the `LanguageAdapter` trait each adapter implements.
//!
//! Grounded on the teacher's `src/lang/common.rs` (`EntityKind`,
//! `ParsedEntity`, `SourceLocation`) and `src/lang/registry.rs` (per-language
//! metadata tables driving adapter construction); generalized here into one
//! table-driven walker so eight languages share a single extraction
//! algorithm instead of eight bespoke hand-rolled visitors.

use tree_sitter::Node;

use crate::ast::Ast;
use crate::errors::Result;
use crate::model::{Language, Span};

/// The handful of entity shapes every detector cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Function,
    Method,
    Class,
}

/// A function/method parameter as seen by the Type (CoT) and Position (CoP)
/// detectors.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub annotated: bool,
}

/// A language-agnostic function, method, or class extracted from an AST.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    pub span: Span,
    pub parent_class: Option<String>,
    pub base_classes: Vec<String>,
    pub params: Vec<ParamInfo>,
    pub return_annotated: bool,
    pub has_doc: bool,
    pub body_text: String,
    pub decorators: Vec<String>,
}

impl Entity {
    pub fn is_trivial_accessor(&self) -> bool {
        let body = self.body_text.trim();
        let line_count = body.lines().filter(|l| !l.trim().is_empty()).count();
        line_count <= 3
            && (self.name.starts_with("get_")
                || self.name.starts_with("set_")
                || self.name.starts_with("is_")
                || self.name == "get"
                || self.name == "set")
    }
}

/// Per-language table of tree-sitter node kind names. Values are the
/// grammar's own node-kind strings (e.g. `"function_definition"` for
/// Python), so the generic walker in this module can recognize function,
/// class, call, and literal nodes without language-specific code.
pub struct NodeKinds {
    pub function_kinds: &'static [&'static str],
    pub method_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub call_kinds: &'static [&'static str],
    pub parameter_kinds: &'static [&'static str],
    pub identifier_kinds: &'static [&'static str],
    pub string_literal_kinds: &'static [&'static str],
    pub number_literal_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    pub assignment_kinds: &'static [&'static str],
    pub comment_kinds: &'static [&'static str],
    pub sleep_call_names: &'static [&'static str],
    /// Field name holding a function/class/method's identifier, as used by
    /// tree-sitter's `node.child_by_field_name("name")` convention.
    pub name_field: &'static str,
    /// Field name holding the parameter list on a function-like node.
    pub params_field: &'static str,
    /// Field name holding the body block on a function-like node.
    pub body_field: &'static str,
}

/// Trait every language adapter implements: parse source into an `Ast`, and
/// expose the node-kind table the generic extractor walks with.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;
    fn node_kinds(&self) -> &'static NodeKinds;
    fn parse(&self, source: &str) -> Result<Ast>;

    /// Extract functions, methods, and classes using the generic walker.
    fn extract_entities(&self, ast: &Ast) -> Vec<Entity> {
        extract_entities_generic(ast, self.node_kinds())
    }
}

fn extract_entities_generic(ast: &Ast, kinds: &NodeKinds) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut class_stack: Vec<String> = Vec::new();
    let mut counter = 0usize;

    walk_with_scope(ast.root_node(), &mut class_stack, &mut |node, scope| {
        let kind_name = node.kind();

        if kinds.class_kinds.contains(&kind_name) {
            let name = node_name(node, ast, kinds).unwrap_or_else(|| {
                counter += 1;
                format!("AnonymousClass{counter}")
            });
            entities.push(Entity {
                id: format!("{}:{}", name, node.start_byte()),
                kind: EntityKind::Class,
                name: name.clone(),
                span: ast.span_of(node),
                parent_class: scope.last().cloned(),
                base_classes: base_classes_of(node, ast, kinds),
                params: Vec::new(),
                return_annotated: false,
                has_doc: has_leading_doc(node, ast, kinds),
                body_text: ast.text(node).to_string(),
                decorators: decorators_of(node, ast, kinds),
            });
            return Some(name);
        }

        if kinds.function_kinds.contains(&kind_name) || kinds.method_kinds.contains(&kind_name) {
            let name = node_name(node, ast, kinds).unwrap_or_else(|| {
                counter += 1;
                format!("anonymous_fn_{counter}")
            });
            let is_method = scope.last().is_some() || kinds.method_kinds.contains(&kind_name);
            entities.push(Entity {
                id: format!("{}:{}", name, node.start_byte()),
                kind: if is_method {
                    EntityKind::Method
                } else {
                    EntityKind::Function
                },
                name,
                span: ast.span_of(node),
                parent_class: scope.last().cloned(),
                base_classes: Vec::new(),
                params: params_of(node, ast, kinds),
                return_annotated: has_return_annotation(node, ast),
                has_doc: has_leading_doc(node, ast, kinds),
                body_text: body_text_of(node, ast, kinds),
                decorators: decorators_of(node, ast, kinds),
            });
        }

        None
    });

    entities
}

/// Walk the tree depth-first, tracking the stack of enclosing class names so
/// nested methods know their parent. `visit` returns `Some(name)` when it
/// just entered a class, which is pushed for the duration of that subtree.
fn walk_with_scope<'a>(
    node: Node<'a>,
    scope: &mut Vec<String>,
    visit: &mut impl FnMut(Node<'a>, &Vec<String>) -> Option<String>,
) {
    let pushed = visit(node, scope);
    if let Some(name) = &pushed {
        scope.push(name.clone());
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_with_scope(child, scope, visit);
    }

    if pushed.is_some() {
        scope.pop();
    }
}

fn node_name(node: Node<'_>, ast: &Ast, kinds: &NodeKinds) -> Option<String> {
    node.child_by_field_name(kinds.name_field)
        .map(|n| ast.text(n).to_string())
}

fn params_of(node: Node<'_>, ast: &Ast, kinds: &NodeKinds) -> Vec<ParamInfo> {
    let Some(param_list) = node.child_by_field_name(kinds.params_field) else {
        return Vec::new();
    };
    let mut params = Vec::new();
    let mut cursor = param_list.walk();
    for child in param_list.children(&mut cursor) {
        if kinds.parameter_kinds.contains(&child.kind()) {
            let text = ast.text(child);
            let name = text
                .split([':', '=', ' '])
                .next()
                .unwrap_or(text)
                .trim_start_matches(['*', '&'])
                .to_string();
            if name == "self" || name == "cls" {
                continue;
            }
            let annotated = text.contains(':') || child.child_by_field_name("type").is_some();
            params.push(ParamInfo { name, annotated });
        }
    }
    params
}

fn has_return_annotation(node: Node<'_>, _ast: &Ast) -> bool {
    node.child_by_field_name("return_type").is_some()
}

fn body_text_of(node: Node<'_>, ast: &Ast, kinds: &NodeKinds) -> String {
    node.child_by_field_name(kinds.body_field)
        .map(|b| ast.text(b).to_string())
        .unwrap_or_default()
}

fn has_leading_doc(node: Node<'_>, ast: &Ast, kinds: &NodeKinds) -> bool {
    if let Some(prev) = node.prev_sibling() {
        if kinds.comment_kinds.contains(&prev.kind()) {
            return true;
        }
    }
    // Python-style docstring: first statement in the body is a bare string.
    if let Some(body) = node.child_by_field_name(kinds.body_field) {
        let mut cursor = body.walk();
        if let Some(first) = body.children(&mut cursor).find(|c| c.is_named()) {
            if kinds.string_literal_kinds.contains(&first.kind())
                || (first.kind() == "expression_statement"
                    && first
                        .named_child(0)
                        .is_some_and(|c| kinds.string_literal_kinds.contains(&c.kind())))
            {
                return true;
            }
        }
    }
    let _ = ast;
    false
}

fn base_classes_of(node: Node<'_>, ast: &Ast, _kinds: &NodeKinds) -> Vec<String> {
    let Some(bases) = node
        .child_by_field_name("superclasses")
        .or_else(|| node.child_by_field_name("superclass"))
        .or_else(|| node.child_by_field_name("interfaces"))
    else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = bases.walk();
    for child in bases.children(&mut cursor) {
        if child.is_named() {
            out.push(ast.text(child).trim().to_string());
        }
    }
    out
}

fn decorators_of(node: Node<'_>, ast: &Ast, _kinds: &NodeKinds) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sib) = current {
        if sib.kind().contains("decorator") || sib.kind().contains("annotation") {
            out.push(ast.text(sib).trim().to_string());
            current = sib.prev_sibling();
        } else {
            break;
        }
    }
    out
}

/// Security-sensitive identifier keywords used for context escalation
/// (§4.5 severity rule 2), shared by every detector.
pub const SECURITY_KEYWORDS: &[&str] = &["password", "secret", "key", "token", "auth", "crypto"];

pub fn contains_security_keyword(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    SECURITY_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Shared parse routine: every adapter just supplies its tree-sitter
/// grammar and language tag.
pub fn parse_source(
    ts_language: tree_sitter::Language,
    language: Language,
    source: &str,
) -> Result<Ast> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&ts_language).map_err(|err| {
        crate::errors::CoreError::internal("lang_adapter", format!("grammar load failed: {err}"))
    })?;

    let tree = parser.parse(source, None).ok_or_else(|| {
        crate::errors::CoreError::parse_error(language.as_str(), "<memory>", "tree-sitter returned no tree")
    })?;

    if tree.root_node().has_error() {
        return Err(crate::errors::CoreError::parse_error(
            language.as_str(),
            "<memory>",
            "source contains a syntax error",
        ));
    }

    Ok(Ast::new(tree, source.to_string(), language))
}
