use serde::{Deserialize, Serialize, de};
use std::borrow::Borrow;
use std::collections::BTreeMap;

use crate::{Architecture, Checksum, SchemaError};

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A package version string, stored as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Download location and expected digest of one architecture's binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryRef {
    url: String,
    checksum: Checksum,
}

impl BinaryRef {
    /// Pair a download URL with the checksum its content must hash to.
    pub fn new(url: impl Into<String>, checksum: Checksum) -> Self {
        Self {
            url: url.into(),
            checksum,
        }
    }

    /// Download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Expected digest of the downloaded bytes.
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}

/// A validated package record.
///
/// Immutable once built: fields are private and only exposed through
/// borrowing accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    name: PackageName,
    version: Version,
    binaries: BTreeMap<Architecture, BinaryRef>,
}

impl Manifest {
    /// Build a manifest from already-validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyField`] if the name or version is blank,
    /// or [`SchemaError::NoBinaries`] if `binaries` is empty.
    pub fn new(
        name: PackageName,
        version: Version,
        binaries: BTreeMap<Architecture, BinaryRef>,
    ) -> Result<Self, SchemaError> {
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyField("name"));
        }
        if version.trim().is_empty() {
            return Err(SchemaError::EmptyField("version"));
        }
        if binaries.is_empty() {
            return Err(SchemaError::NoBinaries);
        }
        Ok(Self {
            name,
            version,
            binaries,
        })
    }

    /// Package name.
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Package version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Every binary, keyed by architecture.
    pub fn binaries(&self) -> &BTreeMap<Architecture, BinaryRef> {
        &self.binaries
    }

    /// Binary for `arch`, if the manifest provides one.
    pub fn binary(&self, arch: Architecture) -> Option<&BinaryRef> {
        self.binaries.get(&arch)
    }

    /// Architectures this manifest ships binaries for, in canonical order.
    pub fn architectures(&self) -> Vec<Architecture> {
        self.binaries.keys().copied().collect()
    }

    /// Split back into the wire shape, with separate URL and checksum maps.
    pub fn to_raw(&self) -> RawManifest {
        RawManifest {
            name: Some(self.name.to_string()),
            version: Some(self.version.to_string()),
            binary_url: Some(
                self.binaries
                    .iter()
                    .map(|(arch, b)| (arch.to_string(), b.url().to_string()))
                    .collect(),
            ),
            binary_sha1: Some(
                self.binaries
                    .iter()
                    .map(|(arch, b)| (arch.to_string(), b.checksum().to_string()))
                    .collect(),
            ),
        }
    }
}

/// Unvalidated package record, exactly as authored.
///
/// Every field is optional so that a missing key surfaces as a validation
/// error naming the field rather than a generic parse failure. Architecture
/// keys stay strings until validation for the same reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManifest {
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Architecture name to download URL.
    #[serde(
        default,
        deserialize_with = "unique_keys",
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_url: Option<BTreeMap<String, String>>,
    /// Architecture name to hex digest. Named after the record format; a
    /// 64-character digest is accepted as SHA-256.
    #[serde(
        default,
        deserialize_with = "unique_keys",
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_sha1: Option<BTreeMap<String, String>>,
}

/// Deserialize a string map, failing on a repeated key instead of keeping
/// the last value.
fn unique_keys<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct UniqueKeys;

    impl<'de> de::Visitor<'de> for UniqueKeys {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a table of architecture names to strings")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: de::MapAccess<'de>,
        {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format_args!("duplicate key `{key}`")));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> BinaryRef {
        BinaryRef::new(
            "https://example.test/mpfr.tar.gz",
            Checksum::parse("a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c").unwrap(),
        )
    }

    #[test]
    fn package_name_is_lowercased() {
        let name = PackageName::new("MPFR");
        assert_eq!(name.as_str(), "mpfr");
        assert!(name == "Mpfr");
    }

    #[test]
    fn manifest_requires_binaries() {
        let err = Manifest::new("mpfr".into(), "3.1.2".into(), BTreeMap::new()).unwrap_err();
        assert_eq!(err, SchemaError::NoBinaries);
    }

    #[test]
    fn manifest_requires_version() {
        let binaries = BTreeMap::from([(Architecture::X86_64, binary())]);
        let err = Manifest::new("mpfr".into(), " ".into(), binaries).unwrap_err();
        assert_eq!(err, SchemaError::EmptyField("version"));
    }

    #[test]
    fn to_raw_splits_maps_with_matching_keys() {
        let binaries = BTreeMap::from([
            (Architecture::X86_64, binary()),
            (Architecture::I686, binary()),
        ]);
        let manifest = Manifest::new("mpfr".into(), "3.1.2".into(), binaries).unwrap();
        let raw = manifest.to_raw();

        let urls = raw.binary_url.unwrap();
        let sums = raw.binary_sha1.unwrap();
        assert_eq!(
            urls.keys().collect::<Vec<_>>(),
            sums.keys().collect::<Vec<_>>()
        );
        assert_eq!(urls["x86_64"], "https://example.test/mpfr.tar.gz");
    }

    #[test]
    fn raw_manifest_rejects_unknown_fields() {
        let json = r#"{"name": "mpfr", "source_url": "https://example.test"}"#;
        assert!(serde_json::from_str::<RawManifest>(json).is_err());
    }

    #[test]
    fn raw_manifest_rejects_duplicate_architecture_keys() {
        let json = r#"{
            "name": "mpfr",
            "binary_sha1": {
                "x86_64": "a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c",
                "x86_64": "eb81b9bb83ebb43b94ab33e43293f1df3bcbad7c"
            }
        }"#;
        let err = serde_json::from_str::<RawManifest>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate key `x86_64`"), "{err}");

        let json = r#"{"binary_url": {"x86_64": "a", "i686": "b"}}"#;
        let raw = serde_json::from_str::<RawManifest>(json).unwrap();
        assert_eq!(raw.binary_url.unwrap().len(), 2);
        assert_eq!(raw.binary_sha1, None);
    }
}
