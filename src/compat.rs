//! Semantic-version compatibility checks.

use once_cell::sync::Lazy;
use semver::Version;

use crate::error::AnalysisError;

/// The engine's own version.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

static ENGINE_SEMVER: Lazy<Version> =
    Lazy::new(|| Version::parse(ENGINE_VERSION).expect("crate version is valid semver"));

/// Check whether a client version is compatible with this engine build.
///
/// Compatible iff the major components match; minor and patch differences
/// are always compatible, in either direction. Fails with
/// [`AnalysisError::InvalidVersion`] when the string is not a parseable
/// `major.minor.patch` version.
pub fn check_compatibility(client_version: &str) -> Result<bool, AnalysisError> {
    let client =
        Version::parse(client_version).map_err(|e| AnalysisError::InvalidVersion {
            version: client_version.to_string(),
            reason: e.to_string(),
        })?;
    Ok(client.major == ENGINE_SEMVER.major)
}
