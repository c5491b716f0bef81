//! Core traits for language analyzers.

use std::path::Path;

use super::FileInventory;

/// Holds a parsed tree-sitter tree and the source it came from.
///
/// Kept separate from the extracted inventory so the tree can feed multiple
/// extraction passes without re-parsing.
pub struct ParsedFile {
    /// The tree-sitter parse tree. May contain ERROR nodes: tree-sitter
    /// recovers from malformed input and the well-formed subtrees are still
    /// harvested.
    pub tree: tree_sitter::Tree,
    /// The original source bytes (kept for node text extraction).
    pub source: Vec<u8>,
    /// File path relative to the analysis root.
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether the tree contains recovered parse errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Language-specific analyzer.
///
/// One implementation per compiled-in grammar. Parsing is deterministic:
/// identical input bytes always yield a structurally identical tree.
///
/// # Thread safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create a parser
/// per call; the analyzer itself only holds the `Language` handle and is
/// freely shared across workers.
pub trait LanguageAnalyzer: Send + Sync {
    /// Language identifier (e.g., `python`).
    fn language_id(&self) -> &'static str;

    /// File extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse source bytes into a tree.
    ///
    /// Fails only when the grammar produces no tree at all; partial syntax
    /// errors still return a valid tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract the normalized symbol/import/reference inventory.
    ///
    /// Emitted symbols follow source position order. Nodes in
    /// error-recovered regions that cannot be confidently classified are
    /// omitted, not fabricated.
    fn extract(&self, parsed: &ParsedFile) -> anyhow::Result<FileInventory>;

    /// Whether this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
