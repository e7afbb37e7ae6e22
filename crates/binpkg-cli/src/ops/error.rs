//! Domain-specific errors for package operations

use binpkg_core::config::ConfigError;
use binpkg_core::io::download::FetchError;
use binpkg_core::io::install::InstallerError;
use binpkg_core::io::verify::VerifyError;
use binpkg_core::manifest::ManifestError;
use binpkg_core::resolver::ResolveError;
use thiserror::Error;

/// Every way an install can fail, one variant per outcome kind.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The manifest could not be read or is not a valid record.
    #[error("Malformed manifest: {0}")]
    MalformedManifest(#[from] ManifestError),

    /// No binary for the requested architecture.
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(#[from] ResolveError),

    /// The download did not complete.
    #[error("Fetch failed: {0}")]
    FetchFailed(FetchError),

    /// The downloaded bytes do not match the declared digest.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest declared in the manifest.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },

    /// The verified artifact could not be moved into place.
    #[error("Install failed: {0}")]
    InstallFailed(#[from] InstallerError),

    /// The run was cancelled before the artifact was installed.
    #[error("Cancelled")]
    Cancelled,

    /// Configuration file or environment is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error outside of the install target.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl InstallError {
    /// Process exit code for this error kind.
    ///
    /// `2` is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Io(_) | Self::Other(_) => 1,
            Self::MalformedManifest(_) => 3,
            Self::UnsupportedArchitecture(_) => 4,
            Self::FetchFailed(_) => 5,
            Self::ChecksumMismatch { .. } => 6,
            Self::InstallFailed(_) => 7,
            Self::Cancelled => 130,
        }
    }
}

impl From<FetchError> for InstallError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled { .. } => Self::Cancelled,
            other => Self::FetchFailed(other),
        }
    }
}

impl From<VerifyError> for InstallError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::ChecksumMismatch { expected, actual } => {
                Self::ChecksumMismatch { expected, actual }
            }
            VerifyError::Io(e) => Self::Io(e),
        }
    }
}

impl From<anyhow::Error> for InstallError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
