/// Target CPU architecture of a prebuilt binary.
///
/// The set is closed: manifests may only key binaries by one of these
/// variants, and resolution of anything else fails. Adding a platform means
/// adding a variant here so every `match` in the workspace has to handle it.
///
/// # Example
///
/// ```
/// use binpkg_schema::Architecture;
///
/// let arch: Architecture = "amd64".parse().unwrap();
/// assert_eq!(arch, Architecture::X86_64);
/// assert_eq!(arch.to_string(), "x86_64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 32-bit ARM with hard float (`armv7l`).
    Armv7l,
    /// 32-bit Intel (`i686`).
    I686,
    /// 64-bit Intel/AMD (`x86_64`).
    #[serde(rename = "x86_64")]
    X86_64,
    /// 64-bit ARM (`aarch64`).
    Aarch64,
}

impl Architecture {
    /// Every supported architecture, in canonical order.
    pub const ALL: [Self; 4] = [Self::Armv7l, Self::I686, Self::X86_64, Self::Aarch64];

    /// Architecture of the running host, if it is one we ship binaries for.
    pub fn current() -> Option<Self> {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    /// Map a Rust `target_arch` name (as in `std::env::consts::ARCH`).
    pub fn from_rust_arch(arch: &str) -> Option<Self> {
        match arch {
            "arm" => Some(Self::Armv7l),
            "x86" => Some(Self::I686),
            "x86_64" => Some(Self::X86_64),
            "aarch64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    /// Canonical name, as written in manifests and printed by `uname -m`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Armv7l => "armv7l",
            Self::I686 => "i686",
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string does not name a supported architecture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown architecture: {0}")]
pub struct UnknownArchitecture(pub String);

impl std::str::FromStr for Architecture {
    type Err = UnknownArchitecture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "armv7l" | "armv7" | "arm" => Ok(Self::Armv7l),
            "i686" | "i586" | "i386" | "x86" => Ok(Self::I686),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            _ => Err(UnknownArchitecture(s.to_string())),
        }
    }
}
