//! Filesystem locations used by binpkg.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the binpkg home directory, or None if the user's home cannot be resolved.
///
/// `BINPKG_HOME` overrides the default of `~/.binpkg`.
pub fn try_binpkg_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("BINPKG_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".binpkg"))
}

/// Default configuration file: `~/.binpkg/config.toml`
pub fn config_path() -> Option<PathBuf> {
    try_binpkg_home().map(|home| home.join("config.toml"))
}

/// Extract the filename from a URL, ignoring any query string or fragment.
///
/// # Example
///
/// ```
/// use binpkg_core::paths::filename_from_url;
///
/// assert_eq!(
///     filename_from_url("https://example.test/s/mpfr-3.1.2-x86_64.tar.gz?dl=1"),
///     "mpfr-3.1.2-x86_64.tar.gz"
/// );
/// assert_eq!(filename_from_url("https://example.test/"), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.split('/').next_back().unwrap_or("")
}
