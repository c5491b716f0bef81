//! JavaScript language analyzer using tree-sitter.
//!
//! Extracts:
//! - Function, class, and method declarations
//! - Top-level `const`/`let`/`var` bindings (arrow functions count as
//!   functions)
//! - ES module imports and CommonJS `require` calls
//! - Call and extends references
//!
//! The grammar handles JSX natively, so `.jsx` files need no dialect switch.

use std::collections::HashSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    qualify, scope_path, FileInventory, ImportRef, LanguageAnalyzer, ParsedFile, RefKind,
    SymbolRef,
};
use crate::model::{Span, Symbol, SymbolKind};

/// Tree-sitter query for extracting declarations.
const DECLARATION_QUERY: &str = r#"
; Functions
(function_declaration
  name: (identifier) @func_name
) @function

; Classes
(class_declaration
  name: (identifier) @class_name
) @class

; Class methods
(method_definition
  name: (property_identifier) @method_name
) @method

; Top-level bindings
(program
  (lexical_declaration
    (variable_declarator) @declarator
  )
)
(program
  (variable_declaration
    (variable_declarator) @declarator
  )
)
(program
  (export_statement
    (lexical_declaration
      (variable_declarator) @declarator
    )
  )
)
"#;

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_statement
  source: (string (string_fragment) @module_path)
)

(export_statement
  source: (string (string_fragment) @module_path)
)

; CommonJS: require("module") - the callee name is checked in code
(call_expression
  function: (identifier) @require_fn
  arguments: (arguments
    (string (string_fragment) @require_path)
  )
)
"#;

/// Tree-sitter query for extracting symbol references.
const REFERENCE_QUERY: &str = r#"
; Plain calls
(call_expression
  function: (identifier) @callee
)

; Constructor calls
(new_expression
  constructor: (identifier) @ctor
)

; Extended base classes
(class_heritage
  (identifier) @base_name
)
"#;

/// JavaScript language analyzer.
pub struct JavaScriptAnalyzer {
    language: Language,
}

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn scope_name(parsed: &ParsedFile, node: Node) -> Option<String> {
        match node.kind() {
            "function_declaration" | "class_declaration" | "method_definition" => node
                .child_by_field_name("name")
                .map(|n| parsed.node_text(n).to_string()),
            _ => None,
        }
    }

    fn classify_declarator(parsed: &ParsedFile, declarator: Node) -> Option<(String, SymbolKind)> {
        let name_node = declarator.child_by_field_name("name")?;
        if name_node.kind() != "identifier" {
            return None;
        }
        let name = parsed.node_text(name_node).to_string();
        if name.is_empty() {
            return None;
        }

        let value_kind = declarator
            .child_by_field_name("value")
            .map(|v| v.kind())
            .unwrap_or("");
        if matches!(value_kind, "arrow_function" | "function_expression" | "function") {
            return Some((name, SymbolKind::Function));
        }

        let keyword = declarator
            .parent()
            .and_then(|decl| decl.child(0))
            .map(|c| c.kind())
            .unwrap_or("");
        let kind = if keyword == "const" {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        Some((name, kind))
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
                    "method_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Method;
                    }
                    "function" | "class" | "method" => {
                        decl_node = Some(capture.node);
                    }
                    "declarator" => {
                        if let Some((var_name, var_kind)) =
                            Self::classify_declarator(parsed, capture.node)
                        {
                            name = var_name;
                            kind = var_kind;
                            decl_node = Some(capture.node);
                        }
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
            let mut module = String::new();
            let mut module_node = None;
            let mut require_fn = "";

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "module_path" => {
                        module = parsed.node_text(capture.node).to_string();
                        module_node = Some(capture.node);
                    }
                    "require_path" => {
                        module = parsed.node_text(capture.node).to_string();
                        module_node = Some(capture.node);
                    }
                    "require_fn" => {
                        require_fn = parsed.node_text(capture.node);
                    }
                    _ => {}
                }
            }

            // A call match is only an import when the callee is `require`.
            if !require_fn.is_empty() && require_fn != "require" {
                continue;
            }

            if let Some(node) = module_node {
                if module.is_empty() || !seen.insert((node.start_byte(), module.clone())) {
                    continue;
                }
                imports.push(ImportRef {
                    module,
                    span: Span::from_node(node),
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
                    "callee" | "ctor" => RefKind::Call,
                    "base_name" => RefKind::Inherit,
                    _ => continue,
                };
                let name = parsed.node_text(capture.node).to_string();
                if name.is_empty() || name == "require" {
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

impl Default for JavaScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!("failed to parse JavaScript source: {}", path.display())
        })?;

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

    fn parse_js(source: &str) -> (JavaScriptAnalyzer, ParsedFile) {
        let analyzer = JavaScriptAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("test.js"), source.as_bytes())
            .unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_extract_declarations() {
        let source = r#"
function handle(event) {}

class Store {
    save(record) {}
}

const VERSION = "2.1";
let attempts = 0;
const render = () => {};
"#;
        let (analyzer, parsed) = parse_js(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        assert_eq!(
            inventory.find_symbol("handle").unwrap().kind,
            SymbolKind::Function
        );
        assert_eq!(inventory.find_symbol("Store").unwrap().kind, SymbolKind::Class);
        assert_eq!(
            inventory.find_symbol("VERSION").unwrap().kind,
            SymbolKind::Constant
        );
        assert_eq!(
            inventory.find_symbol("attempts").unwrap().kind,
            SymbolKind::Variable
        );
        assert_eq!(
            inventory.find_symbol("render").unwrap().kind,
            SymbolKind::Function
        );

        let save = inventory.find_symbol("save").unwrap();
        assert_eq!(save.kind, SymbolKind::Method);
        assert_eq!(save.qualified_name, "Store.save");
    }

    #[test]
    fn test_extract_imports_es_and_commonjs() {
        let source = r#"
import fs from "fs";
import { join } from "./paths";
const http = require("http");
notRequire("ignored");
"#;
        let (analyzer, parsed) = parse_js(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let modules: Vec<&str> = inventory.imports.iter().map(|i| i.module.as_str()).collect();
        assert!(modules.contains(&"fs"));
        assert!(modules.contains(&"./paths"));
        assert!(modules.contains(&"http"));
        assert!(!modules.contains(&"ignored"));
    }

    #[test]
    fn test_extract_references() {
        let source = r#"
class Base {}

class Child extends Base {
    run() {
        helper();
        const b = new Base();
    }
}

function helper() {}
"#;
        let (analyzer, parsed) = parse_js(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let inherit = inventory
            .references
            .iter()
            .find(|r| r.kind == RefKind::Inherit)
            .unwrap();
        assert_eq!(inherit.name, "Base");
        assert_eq!(inherit.scope.as_deref(), Some("Child"));

        let calls: Vec<&str> = inventory
            .references
            .iter()
            .filter(|r| r.kind == RefKind::Call)
            .map(|r| r.name.as_str())
            .collect();
        assert!(calls.contains(&"helper"));
        assert!(calls.contains(&"Base"));
    }

    #[test]
    fn test_jsx_parses_without_errors() {
        let analyzer = JavaScriptAnalyzer::new();
        let source = br#"
function App() {
    return <main className="app" />;
}
"#;
        let parsed = analyzer.parse(Path::new("app.jsx"), source).unwrap();
        let inventory = analyzer.extract(&parsed).unwrap();

        assert!(!inventory.has_parse_errors);
        assert!(inventory.find_symbol("App").is_some());
    }
}
