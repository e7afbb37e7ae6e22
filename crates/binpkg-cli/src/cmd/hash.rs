//! Hash command (manifest authoring aid)

use anyhow::{Context, Result};
use binpkg_core::io::verify::digest_file;
use binpkg_schema::HashAlgorithm;
use std::path::PathBuf;

/// Print the SHA-1 of each file, `sha1sum` style.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let digest = digest_file(path, HashAlgorithm::Sha1)
            .with_context(|| format!("Failed to hash {}", path.display()))?;
        println!("{digest}  {}", path.display());
    }
    Ok(())
}
