//! Python language analyzer using tree-sitter.
//!
//! Extracts:
//! - Function and method definitions (methods are functions nested in a
//!   class body)
//! - Class definitions
//! - Module-level variable assignments
//! - Imports (`import x`, `from x import y`, relative imports)
//! - Call and base-class references

use std::collections::HashSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    nearest_scope, qualify, scope_path, FileInventory, ImportRef, LanguageAnalyzer, ParsedFile,
    RefKind, SymbolRef,
};
use crate::model::{Span, Symbol, SymbolKind};

/// Tree-sitter query for extracting declarations.
const DECLARATION_QUERY: &str = r#"
; Function and method definitions
(function_definition
  name: (identifier) @func_name
) @function

; Class definitions
(class_definition
  name: (identifier) @class_name
) @class

; Module-level variable assignments
(module
  (expression_statement
    (assignment
      left: (identifier) @var_name
    ) @assignment
  )
)
"#;

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
; import module
(import_statement
  name: (dotted_name) @module_name
) @import

; import module as alias
(import_statement
  name: (aliased_import
    name: (dotted_name) @module_name
  )
) @import

; from module import name
(import_from_statement
  module_name: (dotted_name) @module_name
) @import

; from . import name (relative imports)
(import_from_statement
  module_name: (relative_import) @module_name
) @import
"#;

/// Tree-sitter query for extracting symbol references.
const REFERENCE_QUERY: &str = r#"
; Plain function calls
(call
  function: (identifier) @callee
)

; Base classes
(class_definition
  superclasses: (argument_list
    (identifier) @base_name
  )
)
"#;

/// Python language analyzer.
pub struct PythonAnalyzer {
    language: Language,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Declaration name when `node` opens a scope.
    fn scope_name(parsed: &ParsedFile, node: Node) -> Option<String> {
        match node.kind() {
            "function_definition" | "class_definition" => node
                .child_by_field_name("name")
                .map(|n| parsed.node_text(n).to_string()),
            _ => None,
        }
    }

    fn extract_symbols(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Symbol>> {
        let query = Query::new(&self.language, DECLARATION_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let scope_name = |n: Node| Self::scope_name(parsed, n);
        let mut symbols = Vec::new();
        let mut seen_positions = HashSet::new();

        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut kind = SymbolKind::Function;
            let mut decl_node = None;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "func_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Function;
                    }
                    "class_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Class;
                    }
                    "var_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Variable;
                    }
                    "function" | "class" | "assignment" => {
                        decl_node = Some(capture.node);
                    }
                    _ => {}
                }
            }

            let (name, node) = match (name.is_empty(), decl_node) {
                (false, Some(node)) => (name, node),
                _ => continue,
            };

            if !seen_positions.insert((node.start_byte(), name.clone())) {
                continue;
            }

            // A function nested directly in a class body is a method.
            if kind == SymbolKind::Function {
                let enclosing = nearest_scope(node, &|n| {
                    matches!(n.kind(), "function_definition" | "class_definition")
                });
                if enclosing.map(|n| n.kind()) == Some("class_definition") {
                    kind = SymbolKind::Method;
                }
            }

            let scope = scope_path(node, &scope_name);
            symbols.push(Symbol {
                qualified_name: qualify(scope.as_deref(), &name),
                name,
                kind,
                file: parsed.path.clone(),
                span: Span::from_node(node),
                scope,
            });
        }

        symbols.sort_by(|a, b| (a.span.start_byte, &a.name).cmp(&(b.span.start_byte, &b.name)));
        Ok(symbols)
    }

    fn extract_imports(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<ImportRef>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen = HashSet::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                if capture_name != "module_name" {
                    continue;
                }
                let module = parsed.node_text(capture.node).to_string();
                if module.is_empty() || !seen.insert((capture.node.start_byte(), module.clone())) {
                    continue;
                }
                imports.push(ImportRef {
                    module,
                    span: Span::from_node(capture.node),
                });
            }
        }

        imports.sort_by_key(|i| i.span.start_byte);
        Ok(imports)
    }

    fn extract_references(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<SymbolRef>> {
        let query = Query::new(&self.language, REFERENCE_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let scope_name = |n: Node| Self::scope_name(parsed, n);
        let mut references = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                let kind = match capture_name {
                    "callee" => RefKind::Call,
                    "base_name" => RefKind::Inherit,
                    _ => continue,
                };
                let name = parsed.node_text(capture.node).to_string();
                if name.is_empty() {
                    continue;
                }
                references.push(SymbolRef {
                    name,
                    kind,
                    scope: scope_path(capture.node, &scope_name),
                    span: Span::from_node(capture.node),
                });
            }
        }

        references.sort_by_key(|r| r.span.start_byte);
        Ok(references)
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract(&self, parsed: &ParsedFile) -> anyhow::Result<FileInventory> {
        Ok(FileInventory {
            path: parsed.path.clone(),
            language: self.language_id().to_string(),
            symbols: self.extract_symbols(parsed)?,
            imports: self.extract_imports(parsed)?,
            references: self.extract_references(parsed)?,
            has_parse_errors: parsed.has_errors(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_python(source: &str) -> (PythonAnalyzer, ParsedFile) {
        let analyzer = PythonAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("test.py"), source.as_bytes())
            .unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_extract_functions_and_classes() {
        let source = r#"
def top():
    pass

class App:
    def run(self):
        pass

LIMIT = 10
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let top = inventory.find_symbol("top").unwrap();
        assert_eq!(top.kind, SymbolKind::Function);
        assert_eq!(top.qualified_name, "top");
        assert!(top.scope.is_none());

        let app = inventory.find_symbol("App").unwrap();
        assert_eq!(app.kind, SymbolKind::Class);

        let run = inventory.find_symbol("run").unwrap();
        assert_eq!(run.kind, SymbolKind::Method);
        assert_eq!(run.qualified_name, "App.run");
        assert_eq!(run.scope.as_deref(), Some("App"));

        let limit = inventory.find_symbol("LIMIT").unwrap();
        assert_eq!(limit.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_symbols_in_source_order() {
        let source = r#"
def a():
    pass

def b():
    pass

class C:
    pass
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let starts: Vec<usize> = inventory.symbols.iter().map(|s| s.span.start_byte).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import os
import numpy as np
from pathlib import Path
from . import sibling
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let modules: Vec<&str> = inventory.imports.iter().map(|i| i.module.as_str()).collect();
        assert!(modules.contains(&"os"));
        assert!(modules.contains(&"numpy"));
        assert!(modules.contains(&"pathlib"));
        assert!(modules.contains(&"."));
    }

    #[test]
    fn test_extract_call_and_inherit_references() {
        let source = r#"
class Base:
    pass

class Derived(Base):
    def work(self):
        helper()

def helper():
    pass
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let inherit = inventory
            .references
            .iter()
            .find(|r| r.kind == RefKind::Inherit)
            .unwrap();
        assert_eq!(inherit.name, "Base");
        assert_eq!(inherit.scope.as_deref(), Some("Derived"));

        let call = inventory
            .references
            .iter()
            .find(|r| r.kind == RefKind::Call)
            .unwrap();
        assert_eq!(call.name, "helper");
        assert_eq!(call.scope.as_deref(), Some("Derived.work"));
    }

    #[test]
    fn test_malformed_source_still_yields_valid_subtrees() {
        let source = r#"
def good():
    pass

def broken(
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        assert!(inventory.has_parse_errors);
        assert!(inventory.find_symbol("good").is_some());
    }

    #[test]
    fn test_nested_function_scope() {
        let source = r#"
def outer():
    def inner():
        pass
"#;
        let (analyzer, parsed) = parse_python(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let inner = inventory.find_symbol("inner").unwrap();
        assert_eq!(inner.kind, SymbolKind::Function);
        assert_eq!(inner.qualified_name, "outer.inner");
    }
}
