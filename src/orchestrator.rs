//! Top-level analysis orchestration.
//!
//! One `analyze` call moves through: precondition checks, file enumeration,
//! parallel per-file parse/extract, an index barrier, dependency resolution,
//! and aggregation. Per-file failures fold into result metadata; only the
//! precondition/audit/timeout classes in [`AnalysisError`] abort the call.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analysis::{self, CompiledOverrides, FileInventory};
use crate::audit::AuditEmitter;
use crate::capability::{has_capability, CAP_DEEP_MODE};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::model::{AnalysisMetadata, AnalysisResult, SkipReason, SkippedFile, Symbol};
use crate::resolve;

/// Audit event bracketing the start of a deep-mode call.
const EVENT_ANALYSIS_STARTED: &str = "analysis_started";

/// Audit event bracketing the end of a deep-mode call.
const EVENT_ANALYSIS_COMPLETED: &str = "analysis_completed";

/// Per-file processing outcome.
enum FileOutcome {
    Analyzed(Box<FileInventory>),
    Skipped(SkippedFile),
    /// The deadline expired before this file was processed.
    Cancelled(String),
}

/// Analyze a source file or directory tree.
///
/// Returns symbols ordered by file path then source position, dependency
/// edges in the same file order, and metadata covering everything that was
/// skipped along the way.
pub fn analyze<P: AsRef<Path>>(
    source: P,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let source = source.as_ref();
    config.validate()?;

    let start = Instant::now();
    let deadline = config.timeout.map(|t| start + t);

    // Deep-mode preconditions come before any filesystem access: the
    // capability gate first, then the callback requirement.
    let emitter = build_emitter(config)?;

    let source_meta = fs::metadata(source).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AnalysisError::PathNotFound(source.to_path_buf()),
        _ => AnalysisError::PermissionDenied(source.to_path_buf()),
    })?;

    analysis::register_analyzers();
    let overrides = CompiledOverrides::compile(&config.language_overrides)?;
    let excludes = build_globset(&config.exclude_patterns)?;
    let includes = if config.include_patterns.is_empty() {
        None
    } else {
        Some(build_globset(&config.include_patterns)?)
    };

    let (files, mut skipped) = if source_meta.is_file() {
        (vec![source.to_path_buf()], Vec::new())
    } else {
        enumerate_files(source, config, &excludes, includes.as_ref())?
    };
    let root = if source_meta.is_file() {
        source.parent().unwrap_or_else(|| Path::new(""))
    } else {
        source
    };

    if files.is_empty() {
        return Err(AnalysisError::UnsupportedLanguage(source.to_path_buf()));
    }

    if let Some(emitter) = &emitter {
        emitter.emit(
            EVENT_ANALYSIS_STARTED,
            json!({
                "source": source.display().to_string(),
                "files_discovered": files.len(),
            }),
        )?;
    }

    // Parse and extract in parallel; order is preserved by collect.
    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| process_file(root, path, config, &overrides, deadline))
        .collect();

    let mut inventories = Vec::new();
    let mut parse_errors = 0usize;
    let mut timed_out = false;
    for outcome in outcomes {
        match outcome {
            FileOutcome::Analyzed(inventory) => {
                if inventory.has_parse_errors {
                    parse_errors += 1;
                }
                inventories.push(*inventory);
            }
            FileOutcome::Skipped(skip) => {
                if skip.reason == SkipReason::ParseFailed {
                    parse_errors += 1;
                }
                skipped.push(skip);
            }
            FileOutcome::Cancelled(path) => {
                timed_out = true;
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::TimedOut,
                });
            }
        }
    }

    if timed_out && inventories.is_empty() {
        // The deadline expired before a single file completed.
        return Err(AnalysisError::Timeout(
            config.timeout.unwrap_or_default(),
        ));
    }
    if inventories.is_empty()
        && !skipped.is_empty()
        && skipped
            .iter()
            .all(|s| s.reason == SkipReason::UnsupportedLanguage)
    {
        return Err(AnalysisError::UnsupportedLanguage(source.to_path_buf()));
    }

    // Resolution starts only after every extraction has completed, so the
    // deep-mode index is never observed partially built.
    let deep = config.enable_deep_mode;
    let resolution = resolve::resolve(&inventories, deep, emitter.as_ref(), deadline)?;
    timed_out |= resolution.timed_out;

    let symbols: Vec<Symbol> = inventories
        .iter()
        .flat_map(|i| i.symbols.iter().cloned())
        .collect();

    let result = AnalysisResult {
        dependencies: resolution.edges,
        metadata: AnalysisMetadata {
            files_analyzed: inventories.len(),
            files_skipped: skipped.len(),
            parse_errors,
            elapsed: start.elapsed(),
            deep_mode_used: deep,
            timed_out,
            skipped,
        },
        symbols,
    };

    if let Some(emitter) = &emitter {
        emitter.emit(
            EVENT_ANALYSIS_COMPLETED,
            json!({
                "source": source.display().to_string(),
                "files_analyzed": result.metadata.files_analyzed,
                "symbols": result.symbols.len(),
                "dependencies": result.dependencies.len(),
                "timed_out": result.metadata.timed_out,
            }),
        )?;
    }

    Ok(result)
}

/// Analyze a single in-memory buffer.
///
/// `name` labels the buffer in symbol locations; `language_id` selects the
/// grammar directly, since there is no file path to infer from. Oversized
/// and unparseable buffers are recorded the same way per-file outcomes are
/// in [`analyze`].
pub fn analyze_buffer(
    name: &str,
    language_id: &str,
    source: &[u8],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    let start = Instant::now();
    let emitter = build_emitter(config)?;

    analysis::register_analyzers();
    let analyzer = analysis::analyzer_for_language(language_id)
        .ok_or_else(|| AnalysisError::UnsupportedLanguage(PathBuf::from(name)))?;

    if let Some(emitter) = &emitter {
        emitter.emit(
            EVENT_ANALYSIS_STARTED,
            json!({"source": name, "files_discovered": 1}),
        )?;
    }

    let mut inventories = Vec::new();
    let mut skipped = Vec::new();
    let mut parse_errors = 0usize;

    if source.len() as u64 > config.max_file_size {
        skipped.push(SkippedFile {
            path: name.to_string(),
            reason: SkipReason::Oversized,
        });
    } else {
        match analyzer
            .parse(Path::new(name), source)
            .and_then(|parsed| analyzer.extract(&parsed))
        {
            Ok(inventory) => {
                if inventory.has_parse_errors {
                    parse_errors += 1;
                }
                inventories.push(inventory);
            }
            Err(e) => {
                warn!(buffer = name, error = %e, "buffer analysis failed");
                parse_errors += 1;
                skipped.push(SkippedFile {
                    path: name.to_string(),
                    reason: SkipReason::ParseFailed,
                });
            }
        }
    }

    let deep = config.enable_deep_mode;
    let resolution = resolve::resolve(&inventories, deep, emitter.as_ref(), None)?;

    let symbols: Vec<Symbol> = inventories
        .iter()
        .flat_map(|i| i.symbols.iter().cloned())
        .collect();

    let result = AnalysisResult {
        dependencies: resolution.edges,
        metadata: AnalysisMetadata {
            files_analyzed: inventories.len(),
            files_skipped: skipped.len(),
            parse_errors,
            elapsed: start.elapsed(),
            deep_mode_used: deep,
            timed_out: false,
            skipped,
        },
        symbols,
    };

    if let Some(emitter) = &emitter {
        emitter.emit(
            EVENT_ANALYSIS_COMPLETED,
            json!({
                "source": name,
                "files_analyzed": result.metadata.files_analyzed,
                "symbols": result.symbols.len(),
                "dependencies": result.dependencies.len(),
                "timed_out": false,
            }),
        )?;
    }

    Ok(result)
}

/// Enforce deep-mode preconditions and build the emitter when active.
fn build_emitter(config: &AnalysisConfig) -> Result<Option<AuditEmitter>, AnalysisError> {
    if !config.enable_deep_mode {
        return Ok(None);
    }
    if !has_capability(CAP_DEEP_MODE) {
        return Err(AnalysisError::DeepModeUnavailable);
    }
    let callback = config
        .audit_callback
        .clone()
        .ok_or(AnalysisError::AuditCallbackRequired)?;
    Ok(Some(AuditEmitter::new(callback)))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            AnalysisError::InvalidConfig(format!("bad glob pattern {:?}: {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))
}

/// Walk the tree and collect candidate files in sorted order.
///
/// Hidden directories are pruned; exclude/include globs apply per file.
/// Unreadable entries are recorded, not fatal.
fn enumerate_files(
    root: &Path,
    config: &AnalysisConfig,
    excludes: &GlobSet,
    includes: Option<&GlobSet>,
) -> Result<(Vec<PathBuf>, Vec<SkippedFile>), AnalysisError> {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    let mut walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    if let Some(depth) = config.max_depth {
        walker = walker.max_depth(depth);
    }

    for entry in walker.into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        !(e.depth() > 0 && e.file_type().is_dir() && name.starts_with('.'))
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| relative_path(root, p))
                    .unwrap_or_else(|| root.display().to_string());
                warn!(%path, "unreadable entry during enumeration");
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::Unreadable,
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path);
        if excludes.is_match(rel) || excludes.is_match(path) {
            debug!(path = %rel.display(), "excluded by pattern");
            continue;
        }
        if let Some(includes) = includes {
            if !includes.is_match(rel) && !includes.is_match(path) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok((files, skipped))
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Parse and extract one file.
///
/// Every failure here is a per-file outcome; nothing escapes as an error.
fn process_file(
    root: &Path,
    path: &Path,
    config: &AnalysisConfig,
    overrides: &CompiledOverrides,
    deadline: Option<Instant>,
) -> FileOutcome {
    let rel = relative_path(root, path);

    if deadline.is_some_and(|d| Instant::now() >= d) {
        return FileOutcome::Cancelled(rel);
    }

    let skip = |reason: SkipReason| {
        FileOutcome::Skipped(SkippedFile {
            path: rel.clone(),
            reason,
        })
    };

    // Override and extension resolution need no file I/O; the shebang
    // fallback for extensionless files waits until the content is read.
    let mut language = analysis::resolve_language(path, None, overrides);
    if language.is_none() && path.extension().is_some() {
        return skip(SkipReason::UnsupportedLanguage);
    }

    let file_len = match fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) => {
            warn!(file = %rel, error = %e, "stat failed");
            return skip(SkipReason::Unreadable);
        }
    };
    if file_len > config.max_file_size {
        debug!(file = %rel, size = file_len, "exceeds max_file_size");
        return skip(SkipReason::Oversized);
    }

    let source = match fs::read(path) {
        Ok(source) => source,
        Err(e) => {
            warn!(file = %rel, error = %e, "read failed");
            return skip(SkipReason::Unreadable);
        }
    };

    if language.is_none() {
        let first_line = source
            .split(|b| *b == b'\n')
            .next()
            .map(String::from_utf8_lossy);
        language = first_line.as_deref().and_then(analysis::sniff_shebang);
    }
    let language = match language {
        Some(language) => language,
        None => return skip(SkipReason::UnsupportedLanguage),
    };

    let analyzer = match analysis::analyzer_for_language(language) {
        Some(analyzer) => analyzer,
        None => return skip(SkipReason::UnsupportedLanguage),
    };

    // Symbol locations carry root-relative paths for reproducible output.
    match analyzer
        .parse(Path::new(&rel), &source)
        .and_then(|parsed| analyzer.extract(&parsed))
    {
        Ok(inventory) => FileOutcome::Analyzed(Box::new(inventory)),
        Err(e) => {
            warn!(file = %rel, error = %e, "parse failed");
            skip(SkipReason::ParseFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_fails_fast() {
        let err = analyze("/definitely/not/here", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::PathNotFound(_)));
    }

    #[test]
    fn test_single_file_analysis() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.py");
        fs::write(&file, "def main():\n    pass\n").unwrap();

        let result = analyze(&file, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.metadata.files_analyzed, 1);
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].name, "main");
        assert_eq!(result.symbols[0].file, "app.py");
    }

    #[test]
    fn test_unsupported_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "nothing to parse").unwrap();

        let err = analyze(&file, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_directory_with_mixed_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.py"), "def a():\n    pass\n").unwrap();
        fs::write(temp.path().join("b.js"), "function b() {}\n").unwrap();
        fs::write(temp.path().join("README.md"), "# docs\n").unwrap();

        let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();
        assert_eq!(result.metadata.files_analyzed, 2);
        assert_eq!(result.metadata.files_skipped, 1);
        assert_eq!(
            result.metadata.skipped[0].reason,
            SkipReason::UnsupportedLanguage
        );
    }

    #[test]
    fn test_oversized_file_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("small.py"), "def ok():\n    pass\n").unwrap();
        fs::write(temp.path().join("big.py"), "x = 1\n".repeat(1000)).unwrap();

        let config = AnalysisConfig {
            max_file_size: 64,
            ..Default::default()
        };
        let result = analyze(temp.path(), &config).unwrap();

        assert_eq!(result.metadata.files_analyzed, 1);
        assert_eq!(result.metadata.files_skipped, 1);
        assert_eq!(result.metadata.skipped[0].reason, SkipReason::Oversized);
        assert!(result.symbols.iter().all(|s| s.file == "small.py"));
    }

    #[test]
    fn test_shebang_fallback() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("tool");
        fs::write(&script, "#!/usr/bin/env python3\ndef run():\n    pass\n").unwrap();

        let result = analyze(&script, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].name, "run");
    }

    #[test]
    fn test_language_override_beats_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("script.gen"), "def hidden():\n    pass\n").unwrap();

        let config = AnalysisConfig {
            language_overrides: vec![crate::config::LanguageOverride {
                pattern: "*.gen".to_string(),
                language: "python".to_string(),
            }],
            ..Default::default()
        };
        let result = analyze(temp.path(), &config).unwrap();
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].name, "hidden");
    }

    #[test]
    fn test_buffer_analysis() {
        let source = b"def from_buffer():\n    pass\n";
        let result =
            analyze_buffer("buffer.py", "python", source, &AnalysisConfig::default()).unwrap();

        assert_eq!(result.metadata.files_analyzed, 1);
        assert_eq!(result.symbols[0].name, "from_buffer");
    }

    #[test]
    fn test_buffer_with_unknown_language() {
        let err = analyze_buffer("x", "cobol", b"", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedLanguage(_)));
    }

    #[cfg(feature = "deep-mode")]
    #[test]
    fn test_deep_mode_without_callback_fails_before_fs() {
        let config = AnalysisConfig {
            enable_deep_mode: true,
            ..Default::default()
        };
        // The path does not exist; the callback precondition must fire
        // first, proving the filesystem was never consulted.
        let err = analyze("/definitely/not/here", &config).unwrap_err();
        assert!(matches!(err, AnalysisError::AuditCallbackRequired));
    }

    #[cfg(not(feature = "deep-mode"))]
    #[test]
    fn test_deep_mode_without_capability_fails_even_with_callback() {
        use std::sync::Arc;
        let config = AnalysisConfig {
            enable_deep_mode: true,
            audit_callback: Some(Arc::new(|_, _| Ok(()))),
            ..Default::default()
        };
        let err = analyze("/definitely/not/here", &config).unwrap_err();
        assert!(matches!(err, AnalysisError::DeepModeUnavailable));
    }
}
