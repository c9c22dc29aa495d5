// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inspection of Go source files for top-level function declarations.
//!
//! Files are parsed with the tree-sitter Go grammar. Only `function_declaration` and
//! `method_declaration` nodes directly under the source file are reported, so function literals
//! and function types are never mistaken for declarations.

use crate::errors::{SourceInspectError, SourceParseError};
use camino::Utf8Path;
use tree_sitter::{Node, Parser};

/// A top-level function or method declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDecl {
    /// The function name. For methods, this is the method name without the receiver.
    pub name: String,

    /// The 1-based line of the `func` keyword.
    pub line: usize,

    /// The 1-based byte column of the `func` keyword.
    pub column: usize,
}

/// A parser for Go source files, reusable across files.
pub struct GoSourceParser {
    parser: Parser,
}

impl GoSourceParser {
    /// Creates a new parser with the Go grammar loaded.
    pub fn new() -> Result<Self, SourceInspectError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(SourceInspectError::Grammar)?;
        Ok(Self { parser })
    }

    /// Reads the Go source file at `path` and returns its top-level function declarations, in
    /// source order.
    pub fn inspect_file(
        &mut self,
        path: &Utf8Path,
    ) -> Result<Vec<FunctionDecl>, SourceInspectError> {
        let source = std::fs::read_to_string(path).map_err(|error| SourceInspectError::Read {
            path: path.to_owned(),
            error,
        })?;
        self.parse_declarations(&source)
            .map_err(|error| SourceInspectError::Parse {
                path: path.to_owned(),
                error,
            })
    }

    /// Returns the top-level function declarations in `source`, in source order.
    pub fn parse_declarations(
        &mut self,
        source: &str,
    ) -> Result<Vec<FunctionDecl>, SourceParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SourceParseError::new(1, 1, "parser produced no syntax tree"))?;
        let root = tree.root_node();

        if let Some(node) = first_error(root) {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("expected '{}'", node.kind())
            } else {
                "syntax error".to_owned()
            };
            return Err(SourceParseError::new(
                position.row + 1,
                position.column + 1,
                message,
            ));
        }

        let mut cursor = root.walk();
        let mut has_package_clause = false;
        let mut decls = Vec::new();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "package_clause" => has_package_clause = true,
                "function_declaration" | "method_declaration" => {
                    decls.push(function_decl(node, source)?);
                }
                _ => {}
            }
        }

        if !has_package_clause {
            return Err(SourceParseError::new(1, 1, "expected 'package' clause"));
        }
        Ok(decls)
    }
}

fn function_decl(node: Node<'_>, source: &str) -> Result<FunctionDecl, SourceParseError> {
    let position = node.start_position();
    let (line, column) = (position.row + 1, position.column + 1);
    let error = |message: &str| SourceParseError::new(line, column, message);

    let name = node
        .child_by_field_name("name")
        .ok_or_else(|| error("expected function name in declaration"))?;
    let name = name
        .utf8_text(source.as_bytes())
        .map_err(|_| error("function name is not valid UTF-8"))?;

    Ok(FunctionDecl {
        name: name.to_owned(),
        line,
        column,
    })
}

/// Returns the first ERROR or MISSING node in source order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(first_error)
}
