//! Manifest loading and validation.
//!
//! A package record is authored with two parallel maps, `binary_url` and
//! `binary_sha1`, keyed by architecture name. Loading parses the record,
//! reconciles the two maps, and checks every URL and digest before handing
//! back an immutable [`Manifest`]. Nothing here touches the network.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use binpkg_schema::{
    Architecture, BinaryRef, Checksum, Manifest, PackageName, RawManifest, SchemaError, Version,
};
use reqwest::Url;
use thiserror::Error;

/// Errors that make a package record unusable.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The text is not valid TOML/JSON for the record shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required top-level field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `binary_url` and `binary_sha1` are keyed by different architectures.
    #[error(
        "binary_url and binary_sha1 disagree (no checksum for: [{}]; no url for: [{}])",
        .missing_checksums.join(", "),
        .missing_urls.join(", ")
    )]
    KeyMismatch {
        /// Architectures with a URL but no checksum.
        missing_checksums: Vec<String>,
        /// Architectures with a checksum but no URL.
        missing_urls: Vec<String>,
    },

    /// A map key is not a known architecture.
    #[error("unknown architecture key '{0}'")]
    UnknownArchitecture(String),

    /// Two keys (e.g. `x86_64` and `amd64`) name the same architecture.
    #[error("architecture {0} is declared more than once")]
    DuplicateArchitecture(Architecture),

    /// A download URL is not an absolute http(s) URL.
    #[error("invalid url for {arch}: '{url}' ({reason})")]
    InvalidUrl {
        /// Architecture the URL belongs to.
        arch: Architecture,
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A checksum is not a valid digest.
    #[error("invalid checksum for {arch}: {source}")]
    InvalidChecksum {
        /// Architecture the checksum belongs to.
        arch: Architecture,
        /// Underlying validation error.
        source: SchemaError,
    },

    /// Structural check on the assembled manifest failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The manifest could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(String),
}

/// Text encodings a manifest can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    /// TOML (the default).
    #[default]
    Toml,
    /// JSON.
    Json,
}

impl ManifestFormat {
    /// Choose the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Read and validate a manifest file.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file cannot be read, or any other
/// [`ManifestError`] variant if its content is not a valid record.
pub fn load_path(path: &Path) -> Result<Manifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Loading manifest from {}", path.display());
    load_str(&content, ManifestFormat::from_path(path))
}

/// Parse and validate manifest text.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for syntax errors and unknown fields,
/// and the other variants for semantic violations.
pub fn load_str(content: &str, format: ManifestFormat) -> Result<Manifest, ManifestError> {
    let raw: RawManifest = match format {
        ManifestFormat::Toml => {
            toml::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))?
        }
        ManifestFormat::Json => {
            serde_json::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))?
        }
    };
    validate(raw)
}

/// Validate an already-parsed record.
///
/// # Errors
///
/// See [`ManifestError`]; key-set divergence reports every offending key.
pub fn validate(raw: RawManifest) -> Result<Manifest, ManifestError> {
    let name = raw.name.ok_or(ManifestError::MissingField("name"))?;
    let version = raw.version.ok_or(ManifestError::MissingField("version"))?;
    let urls = raw
        .binary_url
        .ok_or(ManifestError::MissingField("binary_url"))?;
    let sums = raw
        .binary_sha1
        .ok_or(ManifestError::MissingField("binary_sha1"))?;

    let missing_checksums: Vec<String> = urls
        .keys()
        .filter(|k| !sums.contains_key(*k))
        .cloned()
        .collect();
    let missing_urls: Vec<String> = sums
        .keys()
        .filter(|k| !urls.contains_key(*k))
        .cloned()
        .collect();
    if !missing_checksums.is_empty() || !missing_urls.is_empty() {
        return Err(ManifestError::KeyMismatch {
            missing_checksums,
            missing_urls,
        });
    }

    // Identical key sets, so both sorted maps iterate in lockstep.
    let mut binaries = BTreeMap::new();
    for ((key, url), digest) in urls.into_iter().zip(sums.into_values()) {
        let arch: Architecture = key
            .parse()
            .map_err(|_| ManifestError::UnknownArchitecture(key.clone()))?;
        validate_url(arch, &url)?;
        let checksum = Checksum::parse(&digest)
            .map_err(|source| ManifestError::InvalidChecksum { arch, source })?;

        if binaries
            .insert(arch, BinaryRef::new(url, checksum))
            .is_some()
        {
            return Err(ManifestError::DuplicateArchitecture(arch));
        }
    }

    Ok(Manifest::new(
        PackageName::new(&name),
        Version::new(&version),
        binaries,
    )?)
}

/// Serialize a manifest back to the authored TOML shape.
///
/// # Errors
///
/// Returns [`ManifestError::Serialize`] if TOML encoding fails.
pub fn to_toml_string(manifest: &Manifest) -> Result<String, ManifestError> {
    toml::to_string_pretty(&manifest.to_raw()).map_err(|e| ManifestError::Serialize(e.to_string()))
}

fn validate_url(arch: Architecture, url: &str) -> Result<(), ManifestError> {
    let invalid = |reason: String| ManifestError::InvalidUrl {
        arch,
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
