//! Reporter trait for dependency injection
//!
//! This trait allows the pipeline to report progress and status without
//! being coupled to a specific terminal UI.

use std::path::Path;
use std::time::Duration;

use binpkg_schema::{Architecture, PackageName, Version};

/// Receives progress events from the install pipeline.
pub trait Reporter: Send + Sync {
    /// The manifest was resolved to a binary for `arch`.
    fn resolved(&self, name: &PackageName, version: &Version, arch: Architecture, url: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>);

    /// A transient failure occurred; another attempt follows after `delay`.
    fn retrying(
        &self,
        name: &PackageName,
        version: &Version,
        attempt: u32,
        delay: Duration,
        reason: &str,
    );

    /// The downloaded artifact is being checksummed.
    fn verifying(&self, name: &PackageName, version: &Version);

    /// The verified artifact is being moved into place.
    fn installing(&self, name: &PackageName, version: &Version, dest: &Path);

    /// Marks a package operation as successfully completed.
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>);

    /// Marks a package operation as failed with a specific reason.
    fn failed(&self, name: &PackageName, version: &Version, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn resolved(&self, name: &PackageName, version: &Version, arch: Architecture, url: &str) {
        (**self).resolved(name, version, arch, url);
    }
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        (**self).downloading(name, version, current, total);
    }
    fn retrying(
        &self,
        name: &PackageName,
        version: &Version,
        attempt: u32,
        delay: Duration,
        reason: &str,
    ) {
        (**self).retrying(name, version, attempt, delay, reason);
    }
    fn verifying(&self, name: &PackageName, version: &Version) {
        (**self).verifying(name, version);
    }
    fn installing(&self, name: &PackageName, version: &Version, dest: &Path) {
        (**self).installing(name, version, dest);
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        (**self).done(name, version, detail, size);
    }
    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        (**self).failed(name, version, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn resolved(&self, _: &PackageName, _: &Version, _: Architecture, _: &str) {}
    fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {}
    fn retrying(&self, _: &PackageName, _: &Version, _: u32, _: Duration, _: &str) {}
    fn verifying(&self, _: &PackageName, _: &Version) {}
    fn installing(&self, _: &PackageName, _: &Version, _: &Path) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &PackageName, _: &Version, _: &str) {}
    fn info(&self, _: &str) {}
}
