//! Atomic placement of verified artifacts.
//!
//! The destination is only ever replaced by a rename, so readers see either
//! the previous file or the complete new one. When the temporary file lives
//! on another filesystem the content is first copied into a sibling of the
//! destination and that sibling is renamed instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use binpkg_schema::Checksum;
use tempfile::TempPath;
use thiserror::Error;

use super::verify::VerifiedArtifact;

/// The destination could not be written.
#[derive(Error, Debug)]
#[error("failed to install {}: {source}", .path.display())]
pub struct InstallerError {
    /// Destination path.
    pub path: PathBuf,
    /// Underlying I/O error.
    pub source: io::Error,
}

/// How the installed file is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Mark the file executable (`0755` instead of `0644`). Unix only.
    pub executable: bool,
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    /// Where the artifact now lives.
    pub path: PathBuf,
    /// Size in bytes.
    pub bytes: u64,
    /// Checksum the content was verified against.
    pub checksum: Checksum,
}

/// Move `artifact` onto `dest`, replacing any existing file atomically.
///
/// Missing parent directories are created. Installing the same artifact
/// twice leaves the same bytes at `dest`.
///
/// # Errors
///
/// Returns [`InstallerError`] on any filesystem failure; `dest` is left as
/// it was and the temporary file is removed.
pub async fn install(
    artifact: VerifiedArtifact,
    dest: &Path,
    options: InstallOptions,
) -> Result<InstalledArtifact, InstallerError> {
    let (temp, bytes, checksum) = artifact.into_parts();
    let target = dest.to_path_buf();

    tokio::task::spawn_blocking(move || place(temp, &target, options))
        .await
        .map_err(|e| InstallerError {
            path: dest.to_path_buf(),
            source: io::Error::other(e),
        })??;

    tracing::info!("Installed {} ({bytes} bytes)", dest.display());
    Ok(InstalledArtifact {
        path: dest.to_path_buf(),
        bytes,
        checksum,
    })
}

fn place(temp: TempPath, dest: &Path, options: InstallOptions) -> Result<(), InstallerError> {
    let fail = |source: io::Error| InstallerError {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = parent_dir(dest) {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    set_mode(&temp, options).map_err(fail)?;

    match temp.persist(dest) {
        Ok(()) => Ok(()),
        Err(err) if err.error.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                "Rename of {} crossed filesystems; copying instead",
                err.path.display()
            );
            // `err.path` still owns the source and removes it when dropped.
            copy_then_rename(&err.path, dest, options).map_err(fail)
        }
        Err(err) => Err(fail(err.error)),
    }
}

/// Copy `src` into a temporary sibling of `dest`, sync it, then rename.
fn copy_then_rename(src: &Path, dest: &Path, options: InstallOptions) -> io::Result<()> {
    let dir = parent_dir(dest).unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".binpkg-")
        .suffix(".part")
        .tempfile_in(dir)?;

    let mut source = fs::File::open(src)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    set_mode(staged.path(), options)?;

    staged.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(unix)]
fn set_mode(path: &Path, options: InstallOptions) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if options.executable { 0o755 } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _options: InstallOptions) -> io::Result<()> {
    Ok(())
}
