//! Core library for binpkg.
//!
//! Loads package manifests, picks the binary for an architecture, and
//! downloads, verifies and installs it. The CLI wires these stages
//! together; each one is usable on its own.

pub mod config;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod reporter;
pub mod resolver;

pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("binpkg/", env!("CARGO_PKG_VERSION"));
