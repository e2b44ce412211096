//! AST abstraction over tree-sitter trees (§3 `AST`, §4.2 C2).
//!
//! `Ast` owns both the parsed `tree_sitter::Tree` and the source text it was
//! parsed from, so callers can borrow `Node`s and slice source text from a
//! single long-lived value. Parser determinism (the invariant that a fixed
//! `content_hash` always yields a bit-identical tree) is tree-sitter's own
//! guarantee: parsing is a pure function of (grammar, source bytes).

pub mod cache;

use tree_sitter::{Node, Point, Tree};

use crate::model::{Language, Span};

/// A parsed source file: the syntax tree plus the text it was built from.
#[derive(Debug)]
pub struct Ast {
    tree: Tree,
    source: String,
    language: Language,
}

impl Ast {
    pub fn new(tree: Tree, source: String, language: Language) -> Self {
        Ast {
            tree,
            source,
            language,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// The raw bytes tree-sitter parsed, for re-running queries/cursors.
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Textual snippet covered by `node`, verbatim.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Convert a tree-sitter node's (0-based) range into our 1-based `Span`.
    pub fn span_of(&self, node: Node<'_>) -> Span {
        point_span(node.start_position(), node.end_position())
    }

    /// Depth-first pre-order walk over every node in the tree, invoking
    /// `visit` with the node and its "parent pointer" (via tree-sitter's
    /// cursor, which already exposes `.parent()` on each node).
    pub fn walk(&self, mut visit: impl FnMut(Node<'_>)) {
        let mut cursor = self.tree.walk();
        loop {
            visit(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    /// Total node count, used to bound detector work to roughly-linear time.
    pub fn node_count(&self) -> usize {
        let mut count = 0usize;
        self.walk(|_| count += 1);
        count
    }
}

fn point_span(start: Point, end: Point) -> Span {
    Span {
        line: start.row as u32 + 1,
        column: start.column as u32 + 1,
        end_line: end.row as u32 + 1,
        end_column: end.column as u32 + 1,
    }
}
