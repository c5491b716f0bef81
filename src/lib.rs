//! Symgraph - syntax-aware code intelligence.
//!
//! Symgraph takes a source file, directory, or in-memory buffer and returns
//! a normalized inventory of program symbols (functions, classes, variables)
//! plus the dependency relationships between them, across multiple
//! languages, using tree-sitter grammars rather than text heuristics.
//!
//! # Architecture
//!
//! - `analysis`: per-language tree-sitter analyzers and the grammar registry
//! - `model`: language-independent symbols, edges, and result types
//! - `resolve`: intra-file and deep-mode cross-file dependency resolution
//! - `orchestrator`: the `analyze` entry point (enumeration, worker pool,
//!   aggregation)
//! - `capability`: build-time-fixed feature discovery
//! - `compat`: semantic-version compatibility checks
//! - `audit`: synchronous, fail-closed audit emission for deep mode
//!
//! # Example
//!
//! ```no_run
//! use symgraph::{analyze, AnalysisConfig};
//!
//! let result = analyze("./src", &AnalysisConfig::default())?;
//! println!(
//!     "{} symbols, {} dependencies",
//!     result.symbols.len(),
//!     result.dependencies.len()
//! );
//! # Ok::<(), symgraph::AnalysisError>(())
//! ```
//!
//! # Deep mode
//!
//! Cross-file resolution is gated twice: the `deep-mode` cargo feature must
//! be compiled in (check [`capabilities`]), and the config must carry an
//! `audit_callback`. Every deep-mode edge is preceded by exactly one audit
//! event; an erroring callback aborts the call rather than dropping records.

pub mod analysis;
mod audit;
mod capability;
mod compat;
mod config;
mod error;
mod model;
mod orchestrator;
mod resolve;

pub use audit::AuditEvent;
pub use capability::{capabilities, has_capability, CAP_DEEP_MODE};
pub use compat::{check_compatibility, ENGINE_VERSION};
pub use config::{
    AnalysisConfig, AuditCallback, LanguageOverride, DEFAULT_EXCLUDE_PATTERNS,
    DEFAULT_MAX_FILE_SIZE,
};
pub use error::AnalysisError;
pub use model::{
    AnalysisMetadata, AnalysisResult, DependencyEdge, DependencyKind, EdgeEndpoint, SkipReason,
    SkippedFile, Span, Symbol, SymbolKind,
};
pub use orchestrator::{analyze, analyze_buffer};
