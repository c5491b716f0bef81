//! Dependency-edge construction.
//!
//! Standard mode resolves intra-file relationships only. Deep mode consults
//! a project-wide symbol index built after all extraction has completed (the
//! index is never read while partially populated) and additionally maps
//! import paths onto analyzed files. Targets that cannot be located produce
//! `resolved=false` edges rather than errors.
//!
//! In deep mode every edge is preceded by exactly one audit event.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde_json::json;
use tracing::debug;

use crate::analysis::{FileInventory, SymbolRef};
use crate::audit::AuditEmitter;
use crate::error::AnalysisError;
use crate::model::{DependencyEdge, DependencyKind, EdgeEndpoint};

/// Audit event type emitted once per deep-mode dependency edge.
pub(crate) const EVENT_DEPENDENCY_RESOLVED: &str = "dependency_resolved";

/// File stems that take their module name from the containing directory.
const DIRECTORY_STEMS: &[&str] = &["__init__", "index", "mod", "lib"];

/// Project-wide symbol index for deep-mode lookups.
///
/// Built once, after the extraction barrier; read-only afterwards.
pub(crate) struct SymbolIndex {
    by_name: HashMap<String, Vec<(String, String)>>,
}

impl SymbolIndex {
    pub(crate) fn build(inventories: &[FileInventory]) -> Self {
        let mut by_name: HashMap<String, Vec<(String, String)>> = HashMap::new();
        for inventory in inventories {
            for symbol in &inventory.symbols {
                by_name
                    .entry(symbol.name.clone())
                    .or_default()
                    .push((inventory.path.clone(), symbol.qualified_name.clone()));
            }
        }
        // Sorted candidates make cross-file resolution deterministic.
        for candidates in by_name.values_mut() {
            candidates.sort();
        }
        Self { by_name }
    }

    /// First candidate declared outside `from_file`, lexicographic by path.
    fn lookup_foreign(&self, name: &str, from_file: &str) -> Option<&(String, String)> {
        self.by_name
            .get(name)?
            .iter()
            .find(|(file, _)| file != from_file)
    }
}

/// Maps import-path tails onto analyzed file paths.
struct ModuleMap {
    by_stem: HashMap<String, Vec<String>>,
}

impl ModuleMap {
    fn build(inventories: &[FileInventory]) -> Self {
        let mut by_stem: HashMap<String, Vec<String>> = HashMap::new();
        for inventory in inventories {
            let path = std::path::Path::new(&inventory.path);
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            let key = if DIRECTORY_STEMS.contains(&stem) {
                match path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                {
                    Some(dir) => dir,
                    None => stem,
                }
            } else {
                stem
            };
            by_stem
                .entry(key.to_string())
                .or_default()
                .push(inventory.path.clone());
        }
        for paths in by_stem.values_mut() {
            paths.sort();
        }
        Self { by_stem }
    }

    /// Resolve a written import path to an analyzed file.
    ///
    /// Matching is by the final path segment (`os.path` -> `path`,
    /// `./config.js` -> `config`, `crate::audit` -> `audit`), excluding the
    /// importing file itself.
    fn resolve(&self, module: &str, from_file: &str) -> Option<&str> {
        // Imports written with a source extension still name the same
        // module; the extension must go before '.' is read as a separator.
        let module = strip_source_extension(module);
        let normalized = module.replace("::", "/").replace('.', "/");
        let tail = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()?;

        self.by_stem
            .get(tail)?
            .iter()
            .map(|p| p.as_str())
            .find(|p| *p != from_file)
    }
}

/// Strip a registered source-file extension from an import path, if any.
fn strip_source_extension(module: &str) -> &str {
    for ext in crate::analysis::supported_extensions() {
        if let Some(stripped) = module.strip_suffix(ext) {
            if let Some(stripped) = stripped.strip_suffix('.') {
                return stripped;
            }
        }
    }
    module
}

/// Result of the resolution phase.
pub(crate) struct ResolveOutcome {
    pub edges: Vec<DependencyEdge>,
    /// Whether the deadline expired mid-phase; edges for the remaining
    /// files were not built.
    pub timed_out: bool,
}

/// Build dependency edges for all inventories.
///
/// Files are processed in their (sorted) input order; within a file,
/// import edges precede reference edges. Requires `emitter` whenever `deep`
/// is set.
pub(crate) fn resolve(
    inventories: &[FileInventory],
    deep: bool,
    emitter: Option<&AuditEmitter>,
    deadline: Option<Instant>,
) -> Result<ResolveOutcome, AnalysisError> {
    let index = if deep {
        Some(SymbolIndex::build(inventories))
    } else {
        None
    };
    let modules = if deep {
        Some(ModuleMap::build(inventories))
    } else {
        None
    };

    let mut edges = Vec::new();
    let mut timed_out = false;

    for inventory in inventories {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!(file = %inventory.path, "deadline expired, stopping resolution");
            timed_out = true;
            break;
        }
        resolve_file(
            inventory,
            index.as_ref(),
            modules.as_ref(),
            emitter,
            &mut edges,
        )?;
    }

    Ok(ResolveOutcome { edges, timed_out })
}

fn resolve_file(
    inventory: &FileInventory,
    index: Option<&SymbolIndex>,
    modules: Option<&ModuleMap>,
    emitter: Option<&AuditEmitter>,
    edges: &mut Vec<DependencyEdge>,
) -> Result<(), AnalysisError> {
    let deep = index.is_some();
    let mut seen = HashSet::new();

    for import in &inventory.imports {
        let target = modules
            .and_then(|m| m.resolve(&import.module, &inventory.path))
            .map(|path| EdgeEndpoint::File {
                path: path.to_string(),
            });
        let resolved = target.is_some();
        let edge = DependencyEdge {
            from: EdgeEndpoint::File {
                path: inventory.path.clone(),
            },
            to: target.unwrap_or(EdgeEndpoint::External {
                name: import.module.clone(),
            }),
            kind: DependencyKind::Import,
            resolved,
        };
        push_edge(edge, &inventory.path, deep, emitter, &mut seen, edges)?;
    }

    for reference in &inventory.references {
        let local = inventory.find_symbol(&reference.name).map(|symbol| {
            EdgeEndpoint::Symbol {
                file: inventory.path.clone(),
                qualified_name: symbol.qualified_name.clone(),
            }
        });

        let (to, resolved) = match local {
            Some(endpoint) => (endpoint, true),
            None => match index.and_then(|i| i.lookup_foreign(&reference.name, &inventory.path)) {
                Some((file, qualified_name)) => (
                    EdgeEndpoint::Symbol {
                        file: file.clone(),
                        qualified_name: qualified_name.clone(),
                    },
                    true,
                ),
                None if deep => (
                    EdgeEndpoint::External {
                        name: reference.name.clone(),
                    },
                    false,
                ),
                // Standard mode resolves intra-file relationships only.
                None => continue,
            },
        };

        let edge = DependencyEdge {
            from: reference_origin(inventory, reference),
            to,
            kind: reference.kind.edge_kind(),
            resolved,
        };
        push_edge(edge, &inventory.path, deep, emitter, &mut seen, edges)?;
    }

    Ok(())
}

/// The `from` endpoint for a reference: its enclosing declaration, or the
/// file itself for top-level code.
fn reference_origin(inventory: &FileInventory, reference: &SymbolRef) -> EdgeEndpoint {
    match &reference.scope {
        Some(scope) => EdgeEndpoint::Symbol {
            file: inventory.path.clone(),
            qualified_name: scope.clone(),
        },
        None => EdgeEndpoint::File {
            path: inventory.path.clone(),
        },
    }
}

/// Append an edge, deduplicating within the file.
///
/// In deep mode the audit event fires before the edge lands in the result;
/// an emitter error aborts resolution entirely.
fn push_edge(
    edge: DependencyEdge,
    file: &str,
    deep: bool,
    emitter: Option<&AuditEmitter>,
    seen: &mut HashSet<(EdgeEndpoint, EdgeEndpoint, DependencyKind)>,
    edges: &mut Vec<DependencyEdge>,
) -> Result<(), AnalysisError> {
    if !seen.insert((edge.from.clone(), edge.to.clone(), edge.kind)) {
        return Ok(());
    }

    if deep {
        if let Some(emitter) = emitter {
            emitter.emit(
                EVENT_DEPENDENCY_RESOLVED,
                json!({
                    "file": file,
                    "kind": edge.kind.as_str(),
                    "from": serde_json::to_value(&edge.from).unwrap_or_default(),
                    "to": serde_json::to_value(&edge.to).unwrap_or_default(),
                    "resolved": edge.resolved,
                }),
            )?;
        }
    }

    edges.push(edge);
    Ok(())
}
