//! Package installation operations.
//!
//! [`install_package`] drives one manifest through the whole typestate
//! chain and reports the outcome. Pipelines for different destinations are
//! independent and may run concurrently on clones of the same [`Context`].

use std::path::PathBuf;

use binpkg_core::Reporter;
use binpkg_core::io::install::InstallOptions;
use binpkg_core::resolver;
use binpkg_schema::Architecture;

use crate::ops::flow::{InstalledPackage, LoadedPackage};
use crate::ops::{Context, InstallError};

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Manifest file to read.
    pub manifest: PathBuf,
    /// Architecture name as given by the user; `None` means the host.
    pub arch: Option<String>,
    /// Destination file, or existing directory.
    pub dest: PathBuf,
    /// Finishing options for the installed file.
    pub options: InstallOptions,
}

/// Run the full pipeline for `request`.
///
/// The architecture name is only interpreted after the manifest has
/// loaded, so a broken manifest is reported as such whatever `--arch` says.
pub async fn install_package(
    ctx: &Context,
    request: &InstallRequest,
) -> Result<InstalledPackage, InstallError> {
    let loaded = LoadedPackage::load(&request.manifest)?;
    let name = loaded.manifest.name().clone();
    let version = loaded.manifest.version().clone();

    match run(ctx, request, loaded).await {
        Ok(installed) => {
            ctx.reporter.done(
                &name,
                &version,
                &installed.installed.path.display().to_string(),
                Some(installed.installed.bytes),
            );
            Ok(installed)
        }
        Err(err) => {
            tracing::debug!("Install of {name} {version} failed: {err}");
            ctx.reporter.failed(&name, &version, &err.to_string());
            Err(err)
        }
    }
}

async fn run(
    ctx: &Context,
    request: &InstallRequest,
    loaded: LoadedPackage,
) -> Result<InstalledPackage, InstallError> {
    let arch = target_architecture(request.arch.as_deref(), ctx.reporter.as_ref())?;
    let resolved = loaded.resolve(arch, ctx.reporter.as_ref())?;
    let dest = resolved.destination(&request.dest)?;

    resolved
        .fetch(ctx, &dest)
        .await?
        .verify(ctx)
        .await?
        .install(ctx, &dest, request.options)
        .await
}

fn target_architecture(
    requested: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<Architecture, InstallError> {
    let arch = match requested {
        Some(name) => resolver::parse_architecture(name)?,
        None => {
            let host = resolver::host_architecture()?;
            reporter.info(&format!("No --arch given, using host architecture {host}"));
            host
        }
    };
    Ok(arch)
}
