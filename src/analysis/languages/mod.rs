//! Language-specific analyzer implementations and the grammar registry.
//!
//! Registration is static: the set of supported grammars is fixed at build
//! time. Language resolution for a file consults, in order:
//! 1. caller-supplied `language_overrides` glob patterns (first match wins)
//! 2. the compiled-in extension mapping
//! 3. a shebang sniff for extensionless files

mod javascript;
mod python;
mod rust_lang;
mod typescript;

pub use javascript::JavaScriptAnalyzer;
pub use python::PythonAnalyzer;
pub use rust_lang::RustAnalyzer;
pub use typescript::TypeScriptAnalyzer;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use globset::{Glob, GlobMatcher};
use once_cell::sync::OnceCell;

use crate::config::LanguageOverride;
use crate::error::AnalysisError;

use super::LanguageAnalyzer;

/// Static storage for the JavaScript analyzer.
static JAVASCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();

/// Static storage for the Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// Static storage for the Rust analyzer.
static RUST_ANALYZER: OnceCell<RustAnalyzer> = OnceCell::new();

/// Static storage for the TypeScript analyzer.
static TYPESCRIPT_ANALYZER: OnceCell<TypeScriptAnalyzer> = OnceCell::new();

/// Whether analyzers have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all compiled-in language analyzers.
///
/// Idempotent; called lazily by every lookup, so explicit startup calls are
/// optional.
pub fn register_analyzers() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return; // Already registered
    }

    JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new);
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new);
    RUST_ANALYZER.get_or_init(RustAnalyzer::new);
    TYPESCRIPT_ANALYZER.get_or_init(TypeScriptAnalyzer::new);
}

/// Get an analyzer by language ID.
///
/// Returns `None` when no grammar is registered for the language.
pub fn analyzer_for_language(language_id: &str) -> Option<&'static dyn LanguageAnalyzer> {
    register_analyzers();

    match language_id {
        "javascript" => JAVASCRIPT_ANALYZER
            .get()
            .map(|a| a as &'static dyn LanguageAnalyzer),
        "python" => PYTHON_ANALYZER
            .get()
            .map(|a| a as &'static dyn LanguageAnalyzer),
        "rust" => RUST_ANALYZER
            .get()
            .map(|a| a as &'static dyn LanguageAnalyzer),
        "typescript" => TYPESCRIPT_ANALYZER
            .get()
            .map(|a| a as &'static dyn LanguageAnalyzer),
        _ => None,
    }
}

/// Map a file extension to a language ID.
fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
        "py" | "pyi" => Some("python"),
        "rs" => Some("rust"),
        "ts" | "tsx" | "mts" => Some("typescript"),
        _ => None,
    }
}

/// All registered language IDs.
pub fn supported_languages() -> &'static [&'static str] {
    &["javascript", "python", "rust", "typescript"]
}

/// All registered file extensions.
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "js", "jsx", "mjs", "cjs", "py", "pyi", "rs", "ts", "tsx", "mts",
    ]
}

/// Language overrides compiled to glob matchers, preserving caller order.
pub struct CompiledOverrides {
    matchers: Vec<(GlobMatcher, String)>,
}

impl CompiledOverrides {
    /// Compile override patterns; a malformed glob is a configuration
    /// error.
    pub fn compile(overrides: &[LanguageOverride]) -> Result<Self, AnalysisError> {
        let mut matchers = Vec::with_capacity(overrides.len());
        for o in overrides {
            let glob = Glob::new(&o.pattern).map_err(|e| {
                AnalysisError::InvalidConfig(format!(
                    "bad language override pattern {:?}: {}",
                    o.pattern, e
                ))
            })?;
            matchers.push((glob.compile_matcher(), o.language.clone()));
        }
        Ok(Self { matchers })
    }

    /// First override whose pattern matches the path or its file name.
    fn language_for(&self, path: &Path) -> Option<&str> {
        let file_name = path.file_name().map(|n| n.to_string_lossy());
        for (matcher, language) in &self.matchers {
            if matcher.is_match(path) {
                return Some(language.as_str());
            }
            if let Some(name) = &file_name {
                if matcher.is_match(name.as_ref()) {
                    return Some(language.as_str());
                }
            }
        }
        None
    }
}

/// Detect a language from a shebang line (for extensionless files).
pub fn sniff_shebang(first_line: &str) -> Option<&'static str> {
    let line = first_line.trim();
    if !line.starts_with("#!") {
        return None;
    }
    if line.contains("python") {
        Some("python")
    } else if line.contains("node") {
        Some("javascript")
    } else {
        None
    }
}

/// Resolve the language for a file.
///
/// `first_line` is only consulted for files without a usable extension.
/// Returns `None` when no registered grammar covers the file.
pub fn resolve_language(
    path: &Path,
    first_line: Option<&str>,
    overrides: &CompiledOverrides,
) -> Option<&'static str> {
    if let Some(language) = overrides.language_for(path) {
        // Overrides may name an unregistered language; treat that as
        // unresolved rather than guessing from the extension.
        return supported_languages()
            .iter()
            .find(|l| **l == language)
            .copied();
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return language_for_extension(ext);
    }

    first_line.and_then(sniff_shebang)
}
