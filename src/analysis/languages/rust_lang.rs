//! Rust language analyzer using tree-sitter.
//!
//! Extracts:
//! - Free functions and impl/trait methods
//! - Struct, enum, trait, and type-alias definitions
//! - Constants, statics, and inline modules
//! - Use declarations (imports)
//! - Call references and trait-impl relationships

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
; Functions and methods
(function_item
  name: (identifier) @func_name
) @function

; Struct declarations
(struct_item
  name: (type_identifier) @struct_name
) @struct

; Enum declarations
(enum_item
  name: (type_identifier) @enum_name
) @enum

; Trait declarations
(trait_item
  name: (type_identifier) @trait_name
) @trait

; Type aliases
(type_item
  name: (type_identifier) @type_name
) @type_alias

; Constants
(const_item
  name: (identifier) @const_name
) @const

; Static items
(static_item
  name: (identifier) @static_name
) @static

; Inline modules
(mod_item
  name: (identifier) @mod_name
) @module
"#;

/// Tree-sitter query for extracting imports (use declarations).
const IMPORT_QUERY: &str = r#"
(use_declaration
  argument: (scoped_identifier) @path
)

(use_declaration
  argument: (use_as_clause
    path: (scoped_identifier) @path
  )
)

(use_declaration
  argument: (identifier) @path
)

(use_declaration
  argument: (scoped_use_list
    path: (_) @path
  )
)
"#;

/// Tree-sitter query for extracting symbol references.
const REFERENCE_QUERY: &str = r#"
; Plain calls
(call_expression
  function: (identifier) @callee
)

; Implemented traits
(impl_item
  trait: (type_identifier) @trait_ref
)
"#;

/// Rust language analyzer.
pub struct RustAnalyzer {
    language: Language,
}

impl RustAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn scope_name(parsed: &ParsedFile, node: Node) -> Option<String> {
        match node.kind() {
            "function_item" | "enum_item" | "struct_item" | "trait_item" | "mod_item" => node
                .child_by_field_name("name")
                .map(|n| parsed.node_text(n).to_string()),
            // Methods live under the impl target's name.
            "impl_item" => node
                .child_by_field_name("type")
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
                    "struct_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Struct;
                    }
                    "enum_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Enum;
                    }
                    "trait_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Trait;
                    }
                    "type_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::TypeAlias;
                    }
                    "const_name" | "static_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Constant;
                    }
                    "mod_name" => {
                        name = parsed.node_text(capture.node).to_string();
                        kind = SymbolKind::Module;
                    }
                    "function" | "struct" | "enum" | "trait" | "type_alias" | "const"
                    | "static" | "module" => {
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

            // Functions inside impl or trait blocks are methods.
            if kind == SymbolKind::Function
                && nearest_scope(node, &|n| matches!(n.kind(), "impl_item" | "trait_item"))
                    .is_some()
            {
                kind = SymbolKind::Method;
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
                if capture_name != "path" {
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
                    "trait_ref" => RefKind::Inherit,
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

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for RustAnalyzer {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Rust source: {}", path.display()))?;

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
