//! Integrity verification of downloaded artifacts.
//!
//! [`verify`] is the only way to obtain a [`VerifiedArtifact`], and the
//! installer only accepts that type, so an unchecked download cannot reach
//! its destination.

use std::io::Read;
use std::path::Path;

use binpkg_schema::{Checksum, HashAlgorithm};
use sha2::Digest;
use tempfile::TempPath;
use thiserror::Error;

use super::download::FetchedArtifact;

/// Errors raised while checking a download against its declared checksum.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The content does not hash to the declared value.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest declared in the manifest.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },

    /// The downloaded file could not be read back.
    #[error("IO error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

/// A downloaded artifact whose content matches its manifest checksum.
///
/// Still a temporary file: dropping it deletes the file.
#[derive(Debug)]
pub struct VerifiedArtifact {
    path: TempPath,
    bytes: u64,
    checksum: Checksum,
}

impl VerifiedArtifact {
    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The checksum the content was verified against.
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub(crate) fn into_parts(self) -> (TempPath, u64, Checksum) {
        (self.path, self.bytes, self.checksum)
    }
}

/// Hash the whole of `artifact` and compare against `expected`.
///
/// Hashing runs on the blocking pool. On mismatch the artifact is dropped,
/// which removes the temporary file.
///
/// # Errors
///
/// Returns [`VerifyError::ChecksumMismatch`] when the digests differ and
/// [`VerifyError::Io`] if the file cannot be read.
pub async fn verify(
    artifact: FetchedArtifact,
    expected: &Checksum,
) -> Result<VerifiedArtifact, VerifyError> {
    let bytes = artifact.bytes();
    let path = artifact.into_temp_path();
    let algorithm = expected.algorithm();

    let (path, actual) = tokio::task::spawn_blocking(move || {
        let digest = digest_file(&path, algorithm);
        (path, digest)
    })
    .await
    .map_err(std::io::Error::other)?;
    let actual = actual?;

    if !expected.matches(&actual) {
        tracing::warn!(
            "Checksum mismatch for {}: expected {expected}, got {actual}",
            path.display()
        );
        return Err(VerifyError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    tracing::debug!("Verified {algorithm} {actual}");
    Ok(VerifiedArtifact {
        path,
        bytes,
        checksum: expected.clone(),
    })
}

/// Hex digest of a file's full content.
///
/// # Errors
///
/// Returns any I/O error from opening or reading the file.
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(file),
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(file),
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let count = reader.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn fetched(content: &[u8]) -> FetchedArtifact {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, content).unwrap();
        FetchedArtifact::for_tests(file.into_temp_path(), content.len() as u64)
    }

    #[test]
    fn digests_with_both_algorithms() {
        let artifact = fetched(b"abc");
        assert_eq!(
            digest_file(artifact.path(), HashAlgorithm::Sha1).unwrap(),
            ABC_SHA1
        );
        assert_eq!(
            digest_file(artifact.path(), HashAlgorithm::Sha256).unwrap(),
            ABC_SHA256
        );
    }

    #[tokio::test]
    async fn matching_sha1_verifies() {
        let expected = Checksum::parse(ABC_SHA1).unwrap();
        let verified = verify(fetched(b"abc"), &expected).await.unwrap();
        assert_eq!(verified.bytes(), 3);
        assert_eq!(verified.checksum(), &expected);
        assert!(verified.path().exists());
    }

    #[tokio::test]
    async fn matching_sha256_verifies() {
        let expected = Checksum::parse(ABC_SHA256).unwrap();
        assert!(verify(fetched(b"abc"), &expected).await.is_ok());
    }

    #[tokio::test]
    async fn mismatch_reports_both_digests_and_removes_file() {
        let artifact = fetched(b"not mpfr");
        let path = artifact.path().to_path_buf();
        let expected = Checksum::parse("a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c").unwrap();

        let err = verify(artifact, &expected).await.unwrap_err();
        match err {
            VerifyError::ChecksumMismatch { expected, actual } => {
                assert_eq!(expected, "a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c");
                assert_eq!(actual.len(), 40);
                assert_ne!(actual, expected);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn empty_file_is_hashed_not_skipped() {
        let expected = Checksum::parse(ABC_SHA1).unwrap();
        let err = verify(fetched(b""), &expected).await.unwrap_err();
        assert!(matches!(err, VerifyError::ChecksumMismatch { .. }));
    }
}
