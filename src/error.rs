//! Fatal error taxonomy for the analysis engine.
//!
//! Only call-level failures surface here. Per-file problems (bad syntax,
//! oversized input, unrecognized language) are folded into
//! [`AnalysisMetadata`](crate::AnalysisMetadata) and never abort a batch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that abort an `analyze` call (or a version check).
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The source path does not exist.
    #[error("source path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The source path exists but cannot be read.
    #[error("permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),

    /// No file under the source path maps to a registered language.
    #[error("no analyzable files under {}", .0.display())]
    UnsupportedLanguage(PathBuf),

    /// Deep mode was requested but this build does not include the
    /// `deep-mode` capability.
    #[error("deep mode is not available in this build")]
    DeepModeUnavailable,

    /// Deep mode was requested without an audit callback. The audit trail
    /// is a precondition for deep mode, not a best-effort extra.
    #[error("deep mode requires an audit callback for compliance tracking")]
    AuditCallbackRequired,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A version string could not be parsed as `major.minor.patch`.
    #[error("invalid version string {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    /// The audit callback returned an error. The call aborts without a
    /// partial result because the audit-trail guarantee cannot be honored.
    #[error("audit callback failed")]
    AuditCallback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The configured timeout expired before any file completed.
    #[error("analysis timed out after {0:?} before any file completed")]
    Timeout(Duration),
}
