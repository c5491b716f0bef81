//! AST-backed symbol extraction.
//!
//! This module turns source files into a normalized, language-independent
//! inventory using tree-sitter:
//! - Symbols (functions, classes, methods, variables, modules)
//! - Imports
//! - Symbol references (calls, inheritance, other named uses)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ Source Files │────▶│ Language       │────▶│ FileInventory  │
//! └──────────────┘     │ Analyzers      │     │ (Symbols,      │
//!                      │ (py/ts/js/rs)  │     │  Imports,      │
//!                      └────────────────┘     │  References)   │
//!                                             └────────────────┘
//! ```
//!
//! # Adding a new language
//!
//! 1. Create a module in `src/analysis/languages/` (e.g., `go.rs`)
//! 2. Implement the `LanguageAnalyzer` trait
//! 3. Define tree-sitter queries for declarations, imports, references
//! 4. Register the analyzer in `languages/mod.rs` and add its capability
//!    string in `capability.rs`
//!
//! See `languages/python.rs` for a reference implementation.

mod inventory;
mod languages;
mod traits;

pub use inventory::{FileInventory, ImportRef, RefKind, SymbolRef};
pub use languages::{
    analyzer_for_language, register_analyzers, resolve_language, sniff_shebang,
    supported_extensions, supported_languages, CompiledOverrides, JavaScriptAnalyzer,
    PythonAnalyzer, RustAnalyzer, TypeScriptAnalyzer,
};
pub use traits::{LanguageAnalyzer, ParsedFile};

/// Dotted path of enclosing declaration names, outermost first.
///
/// `scope_name` maps a node to its declaration name when the node opens a
/// scope, `None` otherwise. Returns `None` for top-level nodes.
pub(crate) fn scope_path<'t>(
    node: tree_sitter::Node<'t>,
    scope_name: &dyn Fn(tree_sitter::Node<'t>) -> Option<String>,
) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = node.parent();
    while let Some(n) = current {
        if let Some(name) = scope_name(n) {
            parts.push(name);
        }
        current = n.parent();
    }
    if parts.is_empty() {
        None
    } else {
        parts.reverse();
        Some(parts.join("."))
    }
}

/// The nearest enclosing ancestor for which `is_scope` holds.
pub(crate) fn nearest_scope<'t>(
    node: tree_sitter::Node<'t>,
    is_scope: &dyn Fn(tree_sitter::Node<'t>) -> bool,
) -> Option<tree_sitter::Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if is_scope(n) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Qualified name for a declaration given its enclosing scope.
pub(crate) fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(s) => format!("{}.{}", s, name),
        None => name.to_string(),
    }
}
