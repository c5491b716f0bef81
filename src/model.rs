//! Normalized, language-independent result types.
//!
//! Every analyzer produces these regardless of source language. All types
//! are plain data, built once per `analyze` call and owned by the caller
//! after return.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Kind of extracted symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
    TypeAlias,
    Variable,
    Constant,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Trait => "trait",
            SymbolKind::Interface => "interface",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Module => "module",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, located program construct extracted from a syntax tree.
///
/// Immutable once created. No two symbols in a result share an identical
/// `(file, span, kind)` triple: each declaration node yields one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// The symbol name (e.g., `parse`, `Config`).
    pub name: String,
    pub kind: SymbolKind,
    /// Dotted path including enclosing scopes (e.g., `Config.parse`).
    pub qualified_name: String,
    /// Path of the file the symbol was extracted from, relative to the
    /// analysis root.
    pub file: String,
    pub span: Span,
    /// Qualified name of the nearest enclosing declaration, if any.
    pub scope: Option<String>,
}

/// One end of a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeEndpoint {
    /// A symbol located in an analyzed file.
    Symbol { file: String, qualified_name: String },
    /// An analyzed file as a whole.
    File { path: String },
    /// A module or name outside the analyzed file set.
    External { name: String },
}

/// Kind of dependency relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Call,
    Inherit,
    Reference,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Import => "import",
            DependencyKind::Call => "call",
            DependencyKind::Inherit => "inherit",
            DependencyKind::Reference => "reference",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dependency relationship between symbols or files.
///
/// `resolved` is `false` when the target could not be located within the
/// analyzed file set. That is a normal, non-fatal state: standard mode never
/// attempts cross-file resolution, and deep mode records misses instead of
/// failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: EdgeEndpoint,
    pub to: EdgeEndpoint,
    pub kind: DependencyKind,
    pub resolved: bool,
}

/// Why a file was skipped rather than analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnsupportedLanguage,
    Oversized,
    Unreadable,
    ParseFailed,
    TimedOut,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnsupportedLanguage => "unsupported_language",
            SkipReason::Oversized => "oversized",
            SkipReason::Unreadable => "unreadable",
            SkipReason::ParseFailed => "parse_failed",
            SkipReason::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file that was enumerated but not analyzed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Aggregate counters and flags for one `analyze` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Files parsed and extracted (including files with recovered parse
    /// errors).
    pub files_analyzed: usize,
    /// Files enumerated but not analyzed.
    pub files_skipped: usize,
    /// Files whose syntax trees contained errors, recovered or fatal.
    pub parse_errors: usize,
    /// Wall-clock duration of the call.
    pub elapsed: Duration,
    /// Whether deep mode was active for this call.
    pub deep_mode_used: bool,
    /// Whether the configured timeout expired before all work completed.
    pub timed_out: bool,
    /// Per-file detail for every skipped file.
    pub skipped: Vec<SkippedFile>,
}

/// Complete result of one `analyze` call.
///
/// Symbols are ordered by file path, then source position within each file.
/// Dependencies follow the same file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbols: Vec<Symbol>,
    pub dependencies: Vec<DependencyEdge>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Symbols extracted from a single file, in source order.
    pub fn symbols_in_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Symbol> {
        self.symbols.iter().filter(move |s| s.file == file)
    }

    /// Edges that could not be resolved to an analyzed target.
    pub fn unresolved_dependencies(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.dependencies.iter().filter(|d| !d.resolved)
    }
}
