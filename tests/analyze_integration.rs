//! Integration tests for the analysis pipeline.
//!
//! These exercise the public API against real directory trees built with
//! tempfile, covering ordering, determinism, and per-file failure handling.

use std::fs;

use symgraph::{
    analyze, analyze_buffer, capabilities, check_compatibility, AnalysisConfig, AnalysisError,
    DependencyKind, SkipReason, SymbolKind, ENGINE_VERSION,
};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_symbols_follow_source_order_per_file() {
    let temp = TempDir::new().unwrap();
    write(
        &temp,
        "app.py",
        r#"
import os

def first():
    pass

class Middle:
    def inner(self):
        pass

def last():
    pass
"#,
    );

    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    let positions: Vec<(usize, usize)> = result
        .symbols_in_file("app.py")
        .map(|s| (s.span.start_line, s.span.start_col))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "symbols must be in source order");
    assert_eq!(result.symbols.len(), 4);
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let temp = TempDir::new().unwrap();
    write(&temp, "one.py", "def a():\n    b()\n\ndef b():\n    pass\n");
    write(&temp, "two.js", "function x() {}\nconst y = () => x();\n");
    write(&temp, "three.rs", "fn main() { helper(); }\nfn helper() {}\n");

    let config = AnalysisConfig::default();
    let first = analyze(temp.path(), &config).unwrap();
    let second = analyze(temp.path(), &config).unwrap();

    assert_eq!(first.symbols, second.symbols);
    assert_eq!(first.dependencies, second.dependencies);
    assert_eq!(
        first.metadata.files_analyzed,
        second.metadata.files_analyzed
    );
    assert_eq!(first.metadata.parse_errors, second.metadata.parse_errors);
}

#[test]
fn test_multi_language_tree() {
    let temp = TempDir::new().unwrap();
    write(&temp, "svc/api.py", "class Api:\n    def get(self):\n        pass\n");
    write(&temp, "web/page.ts", "export function render(): void {}\n");
    write(&temp, "core/lib.rs", "pub fn init() {}\n");

    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    assert_eq!(result.metadata.files_analyzed, 3);
    let kinds: Vec<SymbolKind> = result.symbols.iter().map(|s| s.kind).collect();
    assert!(kinds.contains(&SymbolKind::Class));
    assert!(kinds.contains(&SymbolKind::Method));
    assert!(kinds.contains(&SymbolKind::Function));
}

#[test]
fn test_oversized_file_scenario() {
    let temp = TempDir::new().unwrap();
    write(&temp, "valid.py", "def ok():\n    pass\n");
    write(&temp, "huge.py", &"x = 1\n".repeat(500));

    let config = AnalysisConfig {
        max_file_size: 128,
        ..Default::default()
    };
    let result = analyze(temp.path(), &config).unwrap();

    assert_eq!(result.metadata.files_skipped, 1);
    assert_eq!(result.metadata.skipped[0].path, "huge.py");
    assert_eq!(result.metadata.skipped[0].reason, SkipReason::Oversized);
    assert!(result.symbols.iter().all(|s| s.file == "valid.py"));
}

#[test]
fn test_malformed_file_recovers_partially() {
    let temp = TempDir::new().unwrap();
    write(
        &temp,
        "broken.py",
        "def good():\n    pass\n\ndef bad(:\n",
    );
    write(&temp, "fine.py", "def fine():\n    pass\n");

    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    // The malformed file is recovered, not fatal, and its well-formed
    // subtrees still contribute symbols.
    assert_eq!(result.metadata.files_analyzed, 2);
    assert!(result.metadata.parse_errors >= 1);
    assert!(result.symbols.iter().any(|s| s.name == "good"));
    assert!(result.symbols.iter().any(|s| s.name == "fine"));
}

#[test]
fn test_standard_mode_intra_file_dependencies() {
    let temp = TempDir::new().unwrap();
    write(
        &temp,
        "calls.py",
        r#"
def helper():
    pass

def main():
    helper()
"#,
    );

    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    let call = result
        .dependencies
        .iter()
        .find(|d| d.kind == DependencyKind::Call)
        .expect("intra-file call edge");
    assert!(call.resolved);

    // Standard mode records imports without attempting resolution.
    write(&temp, "imports.py", "import os\n");
    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();
    let import = result
        .dependencies
        .iter()
        .find(|d| d.kind == DependencyKind::Import)
        .expect("import edge");
    assert!(!import.resolved);
    assert!(!result.metadata.deep_mode_used);
}

#[test]
fn test_excluded_directories_are_not_walked() {
    let temp = TempDir::new().unwrap();
    write(&temp, "app.py", "def app():\n    pass\n");
    write(&temp, "node_modules/dep/index.js", "function hidden() {}\n");
    write(&temp, "__pycache__/junk.py", "def cached():\n    pass\n");

    let result = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    assert_eq!(result.metadata.files_analyzed, 1);
    assert!(result.symbols.iter().all(|s| s.file == "app.py"));
}

#[test]
fn test_wholly_unsupported_tree_is_an_error() {
    let temp = TempDir::new().unwrap();
    write(&temp, "a.txt", "plain text");
    write(&temp, "b.md", "# markdown");

    let err = analyze(temp.path(), &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedLanguage(_)));
}

#[test]
fn test_buffer_analysis_matches_file_analysis() {
    let source = "def shared():\n    pass\n\ndef caller():\n    shared()\n";

    let from_buffer = analyze_buffer(
        "mem.py",
        "python",
        source.as_bytes(),
        &AnalysisConfig::default(),
    )
    .unwrap();

    let temp = TempDir::new().unwrap();
    write(&temp, "mem.py", source);
    let from_file = analyze(temp.path(), &AnalysisConfig::default()).unwrap();

    let buffer_names: Vec<&str> = from_buffer.symbols.iter().map(|s| s.name.as_str()).collect();
    let file_names: Vec<&str> = from_file.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(buffer_names, file_names);
    assert_eq!(from_buffer.dependencies.len(), from_file.dependencies.len());
}

#[test]
fn test_tiny_timeout_fails_or_flags() {
    let temp = TempDir::new().unwrap();
    for i in 0..20 {
        write(&temp, &format!("f{i:02}.py"), "def f():\n    pass\n");
    }

    let config = AnalysisConfig {
        timeout: Some(std::time::Duration::from_nanos(1)),
        ..Default::default()
    };
    match analyze(temp.path(), &config) {
        // No file completed before the deadline.
        Err(AnalysisError::Timeout(_)) => {}
        // A worker slipped in before the deadline check; the partial
        // result must carry the flag.
        Ok(result) => assert!(result.metadata.timed_out),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_capabilities_are_stable_and_meaningful() {
    let caps = capabilities();
    assert!(caps.contains(&"symbols"));
    assert!(caps.contains(&"dependencies"));
    assert!(caps.contains(&"lang-python"));
    assert_eq!(caps, capabilities());
}

#[test]
fn test_version_compatibility_contract() {
    assert!(check_compatibility(ENGINE_VERSION).unwrap());

    let major: u64 = ENGINE_VERSION.split('.').next().unwrap().parse().unwrap();
    assert!(check_compatibility(&format!("{major}.99.7")).unwrap());
    assert!(!check_compatibility(&format!("{}.0.0", major + 1)).unwrap());

    assert!(matches!(
        check_compatibility("not-a-version"),
        Err(AnalysisError::InvalidVersion { .. })
    ));
}
