//! TypeScript language analyzer using tree-sitter.
//!
//! Handles both the plain TypeScript and TSX dialects; the grammar is
//! selected per file so queries always run against the tree's own language.

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
  name: (type_identifier) @class_name
) @class

; Class methods
(method_definition
  name: (property_identifier) @method_name
) @method

; Interfaces
(interface_declaration
  name: (type_identifier) @interface_name
) @interface

; Enums
(enum_declaration
  name: (identifier) @enum_name
) @enum

; Type aliases
(type_alias_declaration
  name: (type_identifier) @type_name
) @type_alias

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
(extends_clause
  (identifier) @base_name
)

; Implemented interfaces
(implements_clause
  (type_identifier) @iface_name
)
"#;

/// TypeScript language analyzer.
pub struct TypeScriptAnalyzer {
    typescript: Language,
    tsx: Language,
}

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            typescript: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Grammar for a file path; TSX needs its own dialect.
    fn language_for_path(&self, path: &str) -> &Language {
        if path.ends_with(".tsx") {
            &self.tsx
        } else {
            &self.typescript
        }
    }

    fn create_parser(&self, language: &Language) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        Ok(parser)
    }

    fn scope_name(parsed: &ParsedFile, node: Node) -> Option<String> {
        match node.kind() {
            "function_declaration"
            | "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "method_definition" => node
                .child_by_field_name("name")
                .map(|n| parsed.node_text(n).to_string()),
            _ => None,
        }
    }

    /// Classify a top-level `variable_declarator`.
    ///
    /// Arrow functions and function expressions bound to names count as
    /// functions; other `const` bindings are constants.
    fn classify_declarator(parsed: &ParsedFile, declarator: Node) -> Option<(String, SymbolKind)> {
        let name_node = declarator.child_by_field_name("name")?;
        if name_node.kind() != "identifier" {
            return None; // destructuring patterns are not single symbols
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
        let language = self.language_for_path(&parsed.path);
        let query = Query::new(language, DECLARATION_QUERY)?;
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
                    "interface_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Interface;
                    }
                    "enum_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Enum;
                    }
                    "type_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::TypeAlias;
                    }
                    "function" | "class" | "method" | "interface" | "enum" | "type_alias" => {
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
        let language = self.language_for_path(&parsed.path);
        let query = Query::new(language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen = HashSet::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                if capture_name != "module_path" {
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
        let language = self.language_for_path(&parsed.path);
        let query = Query::new(language, REFERENCE_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let scope_name = |n: Node| Self::scope_name(parsed, n);
        let mut references = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                let kind = match capture_name {
                    "callee" | "ctor" => RefKind::Call,
                    "base_name" | "iface_name" => RefKind::Inherit,
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

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let path_str = path.to_string_lossy().to_string();
        let mut parser = self.create_parser(self.language_for_path(&path_str))?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!("failed to parse TypeScript source: {}", path.display())
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path_str,
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

    fn parse_ts(source: &str) -> (TypeScriptAnalyzer, ParsedFile) {
        let analyzer = TypeScriptAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("test.ts"), source.as_bytes())
            .unwrap();
        (analyzer, parsed)
    }

    #[test]
    fn test_extract_declarations() {
        let source = r#"
export function setup(): void {}

interface Options {
    retries: number;
}

type Handler = (value: string) => void;

enum Level {
    Info,
    Warn,
}

class Service {
    start(): void {}
}

const MAX_RETRIES = 3;
let counter = 0;
const onReady = () => {};
"#;
        let (analyzer, parsed) = parse_ts(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        assert_eq!(
            inventory.find_symbol("setup").unwrap().kind,
            SymbolKind::Function
        );
        assert_eq!(
            inventory.find_symbol("Options").unwrap().kind,
            SymbolKind::Interface
        );
        assert_eq!(
            inventory.find_symbol("Handler").unwrap().kind,
            SymbolKind::TypeAlias
        );
        assert_eq!(inventory.find_symbol("Level").unwrap().kind, SymbolKind::Enum);
        assert_eq!(
            inventory.find_symbol("Service").unwrap().kind,
            SymbolKind::Class
        );
        assert_eq!(
            inventory.find_symbol("MAX_RETRIES").unwrap().kind,
            SymbolKind::Constant
        );
        assert_eq!(
            inventory.find_symbol("counter").unwrap().kind,
            SymbolKind::Variable
        );
        assert_eq!(
            inventory.find_symbol("onReady").unwrap().kind,
            SymbolKind::Function
        );

        let start = inventory.find_symbol("start").unwrap();
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.qualified_name, "Service.start");
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import { readFile } from "fs";
import config from "./config";
export { helper } from "./util";
"#;
        let (analyzer, parsed) = parse_ts(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let modules: Vec<&str> = inventory.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["fs", "./config", "./util"]);
    }

    #[test]
    fn test_extract_references() {
        let source = r#"
interface Greeter {
    greet(): void;
}

class Base {}

class Derived extends Base implements Greeter {
    greet(): void {
        helper();
    }
}

function helper(): void {}
"#;
        let (analyzer, parsed) = parse_ts(source);
        let inventory = analyzer.extract(&parsed).unwrap();

        let inherits: Vec<&str> = inventory
            .references
            .iter()
            .filter(|r| r.kind == RefKind::Inherit)
            .map(|r| r.name.as_str())
            .collect();
        assert!(inherits.contains(&"Base"));
        assert!(inherits.contains(&"Greeter"));

        let call = inventory
            .references
            .iter()
            .find(|r| r.kind == RefKind::Call)
            .unwrap();
        assert_eq!(call.name, "helper");
        assert_eq!(call.scope.as_deref(), Some("Derived.greet"));
    }

    #[test]
    fn test_tsx_dialect_parses() {
        let analyzer = TypeScriptAnalyzer::new();
        let source = br#"
export function Widget() {
    return <div>ready</div>;
}
"#;
        let parsed = analyzer.parse(Path::new("widget.tsx"), source).unwrap();
        let inventory = analyzer.extract(&parsed).unwrap();

        assert!(!inventory.has_parse_errors);
        assert!(inventory.find_symbol("Widget").is_some());
    }
}
