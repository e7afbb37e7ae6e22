//! Installation Flow Typestate Pattern
//!
//! Models the installation pipeline as a series of explicit state transitions:
//!
//! ```text
//! LoadedPackage --[resolve()]--> ResolvedPackage --[fetch()]--> FetchedPackage
//!     --[verify()]--> VerifiedPackage --[install()]--> InstalledPackage
//! ```
//!
//! Each transition consumes the previous state, so a download cannot be
//! installed without passing through verification, and no stage runs twice.
//! A failed transition drops its input; temporary files go with it.
//!
//! # Usage
//!
//! ```ignore
//! let loaded = LoadedPackage::load(manifest_path)?;
//! let resolved = loaded.resolve(arch, ctx.reporter.as_ref())?;
//! let dest = resolved.destination(dest)?;
//! let installed = resolved
//!     .fetch(&ctx, &dest)
//!     .await?
//!     .verify(&ctx)
//!     .await?
//!     .install(&ctx, &dest, options)
//!     .await?;
//! ```

use std::path::{Path, PathBuf};

use binpkg_core::Reporter;
use binpkg_core::io::download::{FetchTarget, FetchedArtifact};
use binpkg_core::io::install::{InstallOptions, InstalledArtifact, InstallerError};
use binpkg_core::io::verify::{self, VerifiedArtifact};
use binpkg_core::paths::filename_from_url;
use binpkg_core::{manifest, resolver};
use binpkg_schema::{Architecture, BinaryRef, Manifest, PackageName, Version};

use crate::ops::{Context, InstallError};

/// State 1: a manifest that parsed and validated.
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    /// The validated record.
    pub manifest: Manifest,
}

/// State 2: the binary for one architecture has been selected.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Package name.
    pub name: PackageName,
    /// Package version.
    pub version: Version,
    /// Architecture the binary was selected for.
    pub arch: Architecture,
    /// URL and expected checksum.
    pub binary: BinaryRef,
}

/// State 3: the artifact is in a temporary file, not yet checked.
#[derive(Debug)]
pub struct FetchedPackage {
    /// What was fetched.
    pub resolved: ResolvedPackage,
    /// Temporary file (removed on drop).
    pub artifact: FetchedArtifact,
}

/// State 4: the temporary file matches the declared checksum.
#[derive(Debug)]
pub struct VerifiedPackage {
    /// What was fetched.
    pub resolved: ResolvedPackage,
    /// Temporary file (removed on drop).
    pub artifact: VerifiedArtifact,
}

/// State 5: the artifact lives at its destination.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// What was installed.
    pub resolved: ResolvedPackage,
    /// Where it went and what it hashed to.
    pub installed: InstalledArtifact,
}

impl LoadedPackage {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, InstallError> {
        let manifest = manifest::load_path(path)?;
        Ok(Self { manifest })
    }

    /// Wrap an already validated manifest.
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    /// Select the binary for `arch`.
    pub fn resolve(
        self,
        arch: Architecture,
        reporter: &dyn Reporter,
    ) -> Result<ResolvedPackage, InstallError> {
        let binary = resolver::resolve(&self.manifest, arch)?.clone();
        let name = self.manifest.name().clone();
        let version = self.manifest.version().clone();
        tracing::debug!("Resolved {name} {version} for {arch}: {}", binary.url());
        reporter.resolved(&name, &version, arch, binary.url());

        Ok(ResolvedPackage {
            name,
            version,
            arch,
            binary,
        })
    }
}

impl ResolvedPackage {
    /// Final path for this artifact.
    ///
    /// An existing directory receives the file under the URL's file name;
    /// anything else is used as the file path itself.
    pub fn destination(&self, dest: &Path) -> Result<PathBuf, InstallError> {
        if !dest.is_dir() {
            return Ok(dest.to_path_buf());
        }
        match filename_from_url(self.binary.url()) {
            "" => Err(InstallError::InstallFailed(InstallerError {
                path: dest.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("cannot derive a file name from {}", self.binary.url()),
                ),
            })),
            file_name => Ok(dest.join(file_name)),
        }
    }

    /// Download the artifact into a temporary file on `dest`'s filesystem.
    pub async fn fetch(self, ctx: &Context, dest: &Path) -> Result<FetchedPackage, InstallError> {
        let target = FetchTarget {
            name: &self.name,
            version: &self.version,
            binary: &self.binary,
            dest,
        };
        let artifact = ctx
            .fetcher
            .fetch(&target, ctx.reporter.as_ref(), &ctx.cancel)
            .await?;

        Ok(FetchedPackage {
            resolved: self,
            artifact,
        })
    }
}

impl FetchedPackage {
    /// Check the artifact against the manifest checksum.
    pub async fn verify(self, ctx: &Context) -> Result<VerifiedPackage, InstallError> {
        if ctx.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let resolved = self.resolved;
        ctx.reporter.verifying(&resolved.name, &resolved.version);

        let artifact = verify::verify(self.artifact, resolved.binary.checksum()).await?;
        Ok(VerifiedPackage { resolved, artifact })
    }
}

impl VerifiedPackage {
    /// Move the artifact onto `dest`.
    ///
    /// Cancellation is honoured up to this point; once the rename starts the
    /// install completes.
    pub async fn install(
        self,
        ctx: &Context,
        dest: &Path,
        options: InstallOptions,
    ) -> Result<InstalledPackage, InstallError> {
        if ctx.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let resolved = self.resolved;
        ctx.reporter.installing(&resolved.name, &resolved.version, dest);

        let installed = binpkg_core::io::install::install(self.artifact, dest, options).await?;
        Ok(InstalledPackage {
            resolved,
            installed,
        })
    }
}
