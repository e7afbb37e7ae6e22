//! binpkg - install a package's prebuilt binary, verified
#![allow(clippy::missing_errors_doc)]
//!
//! Reads a package manifest, picks the binary for the requested
//! architecture, downloads it, checks its digest and moves it into place.
//!
//! # Architecture
//!
//! - **Typestate Pattern**: the install pipeline is the chain
//!   `LoadedPackage` → `ResolvedPackage` → `FetchedPackage` →
//!   `VerifiedPackage` → `InstalledPackage`; each step consumes the previous
//!   state, so no stage can be skipped or repeated.
//! - **Error taxonomy**: every failure ends up as one [`ops::InstallError`]
//!   kind, and each kind has its own process exit code.
//! - **Reporter**: progress goes through [`binpkg_core::Reporter`]; the
//!   binary uses [`ui::ConsoleReporter`], tests use
//!   [`binpkg_core::NullReporter`].

pub mod cmd;
pub mod ops;
pub mod ui;

/// User Agent string (re-exported from `binpkg_core`)
pub use binpkg_core::USER_AGENT;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "binpkg")]
#[command(author, version, about = "binpkg - install verified prebuilt binaries")]
pub struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the binary a manifest provides for an architecture
    Install(InstallArgs),
    /// Validate a manifest and list its architectures
    Check {
        /// Manifest file (TOML, or JSON with a .json extension)
        manifest: PathBuf,
    },
    /// Compute SHA-1 of files (for manifest authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Arguments of `binpkg install`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Manifest file (TOML, or JSON with a .json extension)
    pub manifest: PathBuf,

    /// Target architecture (armv7l, i686, x86_64, aarch64); defaults to the host
    #[arg(long)]
    pub arch: Option<String>,

    /// Destination file, or an existing directory to install into
    #[arg(long)]
    pub dest: PathBuf,

    /// Config file (defaults to $BINPKG_HOME/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Retries after a transient download failure
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Mark the installed file executable
    #[arg(long)]
    pub executable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_install_flags() {
        let cli = Cli::parse_from([
            "binpkg",
            "install",
            "mpfr.toml",
            "--arch",
            "x86_64",
            "--dest",
            "/opt/mpfr.tar.gz",
            "--retries",
            "5",
            "--timeout-seconds",
            "10",
        ]);
        let Commands::Install(args) = cli.command else {
            panic!("expected install");
        };
        assert_eq!(args.manifest, PathBuf::from("mpfr.toml"));
        assert_eq!(args.arch.as_deref(), Some("x86_64"));
        assert_eq!(args.retries, Some(5));
        assert_eq!(args.timeout_seconds, Some(10));
        assert!(!args.executable);
        assert!(!cli.quiet);
    }

    #[test]
    fn dest_is_required() {
        assert!(Cli::try_parse_from(["binpkg", "install", "mpfr.toml"]).is_err());
    }
}
