//! Per-file extraction output.

use crate::model::{DependencyKind, Span, Symbol};

/// An import/dependency statement extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// The imported module path as written (e.g., `os.path`, `./util`,
    /// `std::collections`).
    pub module: String,
    pub span: Span,
}

/// Kind of symbol reference found inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A call to a named function.
    Call,
    /// A base class, extended type, or implemented trait.
    Inherit,
    /// Any other named use of a symbol.
    Reference,
}

impl RefKind {
    /// The dependency-edge kind this reference produces.
    pub fn edge_kind(&self) -> DependencyKind {
        match self {
            RefKind::Call => DependencyKind::Call,
            RefKind::Inherit => DependencyKind::Inherit,
            RefKind::Reference => DependencyKind::Reference,
        }
    }
}

/// A named use of some symbol, to be resolved against declaration tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef {
    /// The referenced name as written.
    pub name: String,
    pub kind: RefKind,
    /// Qualified name of the declaration enclosing the reference, if any.
    pub scope: Option<String>,
    pub span: Span,
}

/// Everything one analyzer extracted from a single file.
///
/// Symbols, imports, and references are each ordered by source position.
#[derive(Debug, Clone)]
pub struct FileInventory {
    /// File path relative to the analysis root.
    pub path: String,
    /// Language identifier.
    pub language: String,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRef>,
    pub references: Vec<SymbolRef>,
    /// Whether the file's tree contained recovered parse errors.
    pub has_parse_errors: bool,
}

impl FileInventory {
    /// Find a declared symbol by bare name, earliest declaration first.
    pub fn find_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolKind;

    fn span(start_byte: usize) -> Span {
        Span {
            start_byte,
            end_byte: start_byte + 1,
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: 2,
        }
    }

    #[test]
    fn test_find_symbol_prefers_earliest() {
        let inventory = FileInventory {
            path: "a.py".to_string(),
            language: "python".to_string(),
            symbols: vec![
                Symbol {
                    name: "run".to_string(),
                    kind: SymbolKind::Function,
                    qualified_name: "run".to_string(),
                    file: "a.py".to_string(),
                    span: span(0),
                    scope: None,
                },
                Symbol {
                    name: "run".to_string(),
                    kind: SymbolKind::Method,
                    qualified_name: "App.run".to_string(),
                    file: "a.py".to_string(),
                    span: span(40),
                    scope: Some("App".to_string()),
                },
            ],
            imports: Vec::new(),
            references: Vec::new(),
            has_parse_errors: false,
        };

        assert_eq!(inventory.find_symbol("run").unwrap().qualified_name, "run");
        assert!(inventory.find_symbol("missing").is_none());
    }

    #[test]
    fn test_ref_kind_edge_mapping() {
        assert_eq!(RefKind::Call.edge_kind(), DependencyKind::Call);
        assert_eq!(RefKind::Inherit.edge_kind(), DependencyKind::Inherit);
        assert_eq!(RefKind::Reference.edge_kind(), DependencyKind::Reference);
    }
}
