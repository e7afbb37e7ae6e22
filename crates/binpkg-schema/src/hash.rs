use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SchemaError;

/// Digest algorithm implied by the length of a declared checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1, 160 bits (40 hex characters). The `binary_sha1` record format.
    Sha1,
    /// SHA-256, 256 bits (64 hex characters).
    Sha256,
}

impl HashAlgorithm {
    /// Number of hex characters in a digest produced by this algorithm.
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Pick the algorithm whose digest has `len` hex characters.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Short lowercase name (`sha1`, `sha256`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, lowercase hex checksum.
///
/// The algorithm is never stored separately: it is derived from the digest
/// length, so a value of this type cannot disagree with itself.
///
/// # Example
///
/// ```
/// use binpkg_schema::{Checksum, HashAlgorithm};
///
/// let sum = Checksum::parse("a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c").unwrap();
/// assert_eq!(sum.algorithm(), HashAlgorithm::Sha1);
/// assert!(Checksum::parse("A80C48BEE7E6E8DDCD1771C4FD7708D89F2ABB9C").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: HashAlgorithm,
    hex: String,
}

impl Checksum {
    /// Validate `s` as a lowercase hex digest of a supported length.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidChecksum`] if the length matches no
    /// supported algorithm, or if `s` contains anything other than
    /// `0-9a-f`.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let algorithm =
            HashAlgorithm::from_hex_len(s.len()).ok_or_else(|| SchemaError::InvalidChecksum {
                value: s.to_string(),
                reason: format!("expected 40 (sha1) or 64 (sha256) hex characters, got {}", s.len()),
            })?;

        if let Some(bad) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(SchemaError::InvalidChecksum {
                value: s.to_string(),
                reason: format!("'{bad}' is not a lowercase hex digit"),
            });
        }

        Ok(Self {
            algorithm,
            hex: s.to_string(),
        })
    }

    /// Algorithm implied by the digest length.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The digest as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Whether `actual_hex` (as produced by a hasher) equals this digest.
    pub fn matches(&self, actual_hex: &str) -> bool {
        self.hex == actual_hex
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}

impl AsRef<str> for Checksum {
    fn as_ref(&self) -> &str {
        &self.hex
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex)
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
