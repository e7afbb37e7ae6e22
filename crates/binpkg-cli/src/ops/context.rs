//! Shared installation context.
//!
//! Groups the state every pipeline stage needs so it is passed as one
//! reference instead of four arguments.

use binpkg_core::Reporter;
use binpkg_core::config::FetchConfig;
use binpkg_core::io::download::Fetcher;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Groups common state used during installation operations.
///
/// Cheap to clone: concurrent pipelines share the HTTP connection pool and
/// the reporter.
#[derive(Clone)]
pub struct Context {
    /// Downloader carrying the HTTP client and retry policy.
    pub fetcher: Fetcher,
    /// Progress sink.
    pub reporter: Arc<dyn Reporter>,
    /// Cancels in-flight work when fired.
    pub cancel: CancellationToken,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("fetcher", &self.fetcher)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context from its parts.
    pub fn new(
        client: reqwest::Client,
        config: FetchConfig,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(client, config),
            reporter,
            cancel,
        }
    }
}
