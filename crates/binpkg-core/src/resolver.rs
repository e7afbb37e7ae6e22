//! Architecture resolution.
//!
//! Picks the binary a manifest provides for a target architecture. The
//! target is always chosen by the caller; [`host_architecture`] is offered
//! for callers that want the running machine.

use binpkg_schema::{Architecture, BinaryRef, Manifest};
use thiserror::Error;

/// The requested architecture cannot be served.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The manifest has no binary for a known architecture.
    #[error(
        "{package} has no binary for {requested} (available: {})",
        join(.available)
    )]
    NotProvided {
        /// Package being resolved.
        package: String,
        /// Architecture that was asked for.
        requested: Architecture,
        /// Architectures the manifest does provide.
        available: Vec<Architecture>,
    },

    /// The architecture name is not one we recognise.
    #[error("unsupported architecture '{0}'")]
    Unknown(String),

    /// The host is not one of the supported architectures.
    #[error("host architecture '{0}' is not supported")]
    UnsupportedHost(&'static str),
}

fn join(archs: &[Architecture]) -> String {
    archs
        .iter()
        .map(Architecture::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Select the binary `manifest` provides for `arch`.
///
/// Every entry is treated alike; there is no fallback to a "compatible"
/// architecture.
///
/// # Errors
///
/// Returns [`ResolveError::NotProvided`] if the manifest has no entry for
/// `arch`.
pub fn resolve(manifest: &Manifest, arch: Architecture) -> Result<&BinaryRef, ResolveError> {
    manifest
        .binary(arch)
        .ok_or_else(|| ResolveError::NotProvided {
            package: manifest.name().to_string(),
            requested: arch,
            available: manifest.architectures(),
        })
}

/// Parse a user-supplied architecture name.
///
/// # Errors
///
/// Returns [`ResolveError::Unknown`] for names outside the supported set.
pub fn parse_architecture(name: &str) -> Result<Architecture, ResolveError> {
    name.parse()
        .map_err(|_| ResolveError::Unknown(name.to_string()))
}

/// Architecture of the running host.
///
/// # Errors
///
/// Returns [`ResolveError::UnsupportedHost`] when the host CPU has no
/// counterpart in [`Architecture`].
pub fn host_architecture() -> Result<Architecture, ResolveError> {
    Architecture::current().ok_or(ResolveError::UnsupportedHost(std::env::consts::ARCH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use binpkg_schema::{Checksum, PackageName, Version};
    use std::collections::BTreeMap;

    fn x86_only() -> Manifest {
        let binary = BinaryRef::new(
            "https://example.test/mpfr.tar.gz",
            Checksum::parse("a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c").unwrap(),
        );
        Manifest::new(
            PackageName::new("mpfr"),
            Version::new("3.1.2"),
            BTreeMap::from([(Architecture::X86_64, binary)]),
        )
        .unwrap()
    }

    #[test]
    fn resolves_present_architecture() {
        let manifest = x86_only();
        let binary = resolve(&manifest, Architecture::X86_64).unwrap();
        assert_eq!(binary.url(), "https://example.test/mpfr.tar.gz");
    }

    #[test]
    fn absent_architecture_is_unsupported() {
        let manifest = x86_only();
        for arch in [
            Architecture::Armv7l,
            Architecture::I686,
            Architecture::Aarch64,
        ] {
            let err = resolve(&manifest, arch).unwrap_err();
            assert_eq!(
                err,
                ResolveError::NotProvided {
                    package: "mpfr".into(),
                    requested: arch,
                    available: vec![Architecture::X86_64],
                }
            );
        }
    }

    #[test]
    fn error_lists_available_architectures() {
        let err = resolve(&x86_only(), Architecture::Armv7l).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mpfr has no binary for armv7l (available: x86_64)"
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            parse_architecture("mips"),
            Err(ResolveError::Unknown("mips".into()))
        );
        assert_eq!(parse_architecture("x86_64"), Ok(Architecture::X86_64));
    }
}
