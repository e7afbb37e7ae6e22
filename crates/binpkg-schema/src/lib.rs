//! Shared types for binpkg package manifests.
//!
//! A manifest names a package, its version, and one prebuilt binary per
//! [`Architecture`], each with a download URL and a [`Checksum`]. The types
//! here only enforce structural invariants; parsing, URL validation and
//! key-set reconciliation live in `binpkg-core`.

/// Target architectures.
pub mod arch;
/// Declared digests and their algorithms.
pub mod hash;
/// Manifest model and identifier newtypes.
pub mod types;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use types::*;

/// Structural violations detected while building schema values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A required string field is empty or whitespace.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// The manifest declares no binaries at all.
    #[error("manifest declares no binaries")]
    NoBinaries,

    /// A checksum is not a lowercase hex digest of a supported length.
    #[error("invalid checksum '{value}': {reason}")]
    InvalidChecksum {
        /// The rejected checksum string.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
