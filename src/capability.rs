//! Build-time-fixed capability registry.
//!
//! The capability set is populated once at first use from compile-time
//! constants and never mutated afterwards. Callers query it to discover
//! what this build of the engine can do before relying on optional
//! behavior such as deep mode.

use once_cell::sync::Lazy;

/// Capability string advertised when cross-file resolution is compiled in.
pub const CAP_DEEP_MODE: &str = "deep-mode";

static CAPABILITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut caps = vec![
        "symbols",
        "dependencies",
        "lang-python",
        "lang-typescript",
        "lang-javascript",
        "lang-rust",
    ];
    if cfg!(feature = "deep-mode") {
        caps.push(CAP_DEEP_MODE);
    }
    caps
});

/// The capability strings supported by this build.
///
/// The set is fixed per build and querying it has no side effects.
pub fn capabilities() -> &'static [&'static str] {
    &CAPABILITIES
}

/// Whether this build supports the named capability.
pub fn has_capability(name: &str) -> bool {
    CAPABILITIES.iter().any(|c| *c == name)
}
