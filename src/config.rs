//! Analysis configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AnalysisError;

/// Default maximum file size: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default glob patterns excluded from directory walks.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/__pycache__/**",
    "**/target/**",
    "**/.venv/**",
    "**/venv/**",
    "**/.pytest_cache/**",
    "**/*.min.js",
];

/// Caller-supplied sink for deep-mode audit events.
///
/// Invoked synchronously with `(event_type, data)`; `data` always carries a
/// `timestamp` key. Returning an error aborts the in-flight `analyze` call.
pub type AuditCallback = Arc<
    dyn Fn(&str, &serde_json::Value) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;

/// Maps files matching a glob pattern to a language, overriding extension
/// inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageOverride {
    /// Glob pattern matched against the file path and file name.
    pub pattern: String,
    /// Language identifier (e.g., `python`).
    pub language: String,
}

/// Configuration for one `analyze` call.
///
/// Caller-constructed and read-only during analysis.
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Enable cross-file/cross-project dependency resolution. Requires the
    /// `deep-mode` capability and an `audit_callback`.
    pub enable_deep_mode: bool,
    /// Audit event sink, mandatory when `enable_deep_mode` is set.
    pub audit_callback: Option<AuditCallback>,
    /// Per-pattern language overrides, first match wins.
    pub language_overrides: Vec<LanguageOverride>,
    /// Files larger than this are skipped and recorded, not parsed.
    pub max_file_size: u64,
    /// Bound on the entire `analyze` call. Expiry at a per-file boundary
    /// yields a partial result with the `timed_out` flag set.
    pub timeout: Option<Duration>,
    /// Glob patterns filtered out of directory walks.
    pub exclude_patterns: Vec<String>,
    /// If non-empty, only files matching one of these globs are analyzed.
    pub include_patterns: Vec<String>,
    /// Maximum directory depth to traverse.
    pub max_depth: Option<usize>,
    /// Whether to follow symbolic links during traversal.
    pub follow_symlinks: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable_deep_mode: false,
            audit_callback: None,
            language_overrides: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: None,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            include_patterns: Vec::new(),
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

impl AnalysisConfig {
    /// Validate field invariants.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_file_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_file_size must be positive".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "max_depth must be positive or unset".to_string(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(AnalysisError::InvalidConfig(
                "timeout must be non-zero or unset".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("enable_deep_mode", &self.enable_deep_mode)
            .field("audit_callback", &self.audit_callback.is_some())
            .field("language_overrides", &self.language_overrides)
            .field("max_file_size", &self.max_file_size)
            .field("timeout", &self.timeout)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("include_patterns", &self.include_patterns)
            .field("max_depth", &self.max_depth)
            .field("follow_symlinks", &self.follow_symlinks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert!(!config.enable_deep_mode);
        assert!(config.audit_callback.is_none());
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(config.exclude_patterns.iter().any(|p| p.contains(".git")));
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_max_file_size_rejected() {
        let config = AnalysisConfig {
            max_file_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_max_depth_rejected() {
        let config = AnalysisConfig {
            max_depth: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_does_not_require_callback_debug() {
        let config = AnalysisConfig {
            audit_callback: Some(Arc::new(|_, _| Ok(()))),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("audit_callback: true"));
    }
}
