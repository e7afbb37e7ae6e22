//! Check command: validate a manifest without fetching anything.

use crate::ops::InstallError;
use crate::ops::flow::LoadedPackage;
use crossterm::style::Stylize;
use std::path::Path;

/// Validate `path` and list the binaries it provides.
pub fn check(path: &Path) -> Result<(), InstallError> {
    let loaded = LoadedPackage::load(path)?;
    let manifest = &loaded.manifest;

    println!(
        "{} {} {}",
        manifest.name().as_str().bold(),
        manifest.version().as_str().dark_grey(),
        "ok".green()
    );
    for (arch, binary) in manifest.binaries() {
        println!(
            "  {:<8} {} {}",
            arch.as_str(),
            binary.checksum().algorithm(),
            binary.url()
        );
    }
    Ok(())
}
