//! Artifact download with retry, timeout and cancellation.
//!
//! The body is streamed into a temporary file in the nearest existing
//! directory on the destination's path, so the installer can rename it into
//! place without crossing filesystems and nothing is created before the
//! artifact is verified. The temporary file is owned by a [`TempPath`], which
//! deletes it on drop: any early return, including cancellation, cleans up.

use std::path::{Path, PathBuf};

use binpkg_schema::{BinaryRef, PackageName, Version};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::Reporter;
use crate::config::FetchConfig;

/// Errors surfaced by [`Fetcher::fetch`].
#[derive(Error, Debug)]
pub enum FetchError {
    /// Every attempt failed, or the server answered with a permanent error.
    #[error("download of {url} failed after {attempts} attempt(s): {cause}")]
    Failed {
        /// URL that was requested.
        url: String,
        /// Number of requests made.
        attempts: u32,
        /// Description of the last failure.
        cause: String,
    },

    /// The caller's cancellation token fired.
    #[error("download of {url} was cancelled")]
    Cancelled {
        /// URL that was being requested.
        url: String,
    },

    /// The temporary file could not be created or written.
    #[error("IO error while downloading to {}: {source}", .dir.display())]
    Io {
        /// Directory holding the temporary file.
        dir: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// What to fetch and where it will eventually live.
#[derive(Debug, Clone, Copy)]
pub struct FetchTarget<'a> {
    /// Package the artifact belongs to, for progress reporting.
    pub name: &'a PackageName,
    /// Package version, for progress reporting.
    pub version: &'a Version,
    /// URL and expected checksum.
    pub binary: &'a BinaryRef,
    /// Final install path. The temporary file is created in its closest
    /// existing ancestor directory.
    pub dest: &'a Path,
}

/// A downloaded, not yet verified, artifact in a temporary file.
///
/// Dropping this value deletes the file.
#[derive(Debug)]
pub struct FetchedArtifact {
    path: TempPath,
    bytes: u64,
}

impl FetchedArtifact {
    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn into_temp_path(self) -> TempPath {
        self.path
    }

    #[cfg(test)]
    pub(crate) fn for_tests(path: TempPath, bytes: u64) -> Self {
        Self { path, bytes }
    }
}

/// Outcome of one request.
enum AttemptError {
    /// Worth retrying: connection trouble, timeouts, 5xx, short body.
    Transient(String),
    /// Retrying cannot help: any 4xx, malformed request.
    Permanent(String),
    Cancelled,
    Io(std::io::Error),
}

/// Downloads artifacts according to a [`FetchConfig`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a fetcher sharing `client`'s connection pool.
    pub fn new(client: Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Retry/timeout policy in effect.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Stream `target.binary.url()` into a temporary file near `target.dest`.
    ///
    /// Transient failures are retried up to `config.retries` times with
    /// exponential backoff. Each attempt starts from an empty file.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Failed`] on a permanent HTTP error or once
    /// retries are exhausted, [`FetchError::Cancelled`] if `cancel` fires,
    /// and [`FetchError::Io`] if the temporary file cannot be written. No
    /// temporary file survives an error.
    pub async fn fetch<R: Reporter + ?Sized>(
        &self,
        target: &FetchTarget<'_>,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<FetchedArtifact, FetchError> {
        let url = target.binary.url();
        let staging_dir = staging_dir(target.dest);
        let io_error = |source: std::io::Error| FetchError::Io {
            dir: staging_dir.clone(),
            source,
        };

        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!("GET {url} (attempt {attempt}/{max_attempts})");

            let (file, path) = tempfile::Builder::new()
                .prefix(".binpkg-")
                .suffix(".part")
                .tempfile_in(&staging_dir)
                .map_err(io_error)?
                .into_parts();
            let mut file = tokio::fs::File::from_std(file);

            let cause = match self
                .attempt(target, &mut file, reporter, cancel)
                .await
            {
                Ok(bytes) => {
                    tracing::debug!("Downloaded {bytes} bytes from {url}");
                    return Ok(FetchedArtifact { path, bytes });
                }
                Err(AttemptError::Transient(cause)) => cause,
                Err(AttemptError::Permanent(cause)) => {
                    return Err(FetchError::Failed {
                        url: url.to_string(),
                        attempts: attempt,
                        cause,
                    });
                }
                Err(AttemptError::Cancelled) => {
                    return Err(FetchError::Cancelled {
                        url: url.to_string(),
                    });
                }
                Err(AttemptError::Io(source)) => return Err(io_error(source)),
            };

            // Discard the partial file before waiting.
            drop(file);
            drop(path);

            if attempt >= max_attempts {
                return Err(FetchError::Failed {
                    url: url.to_string(),
                    attempts: attempt,
                    cause,
                });
            }

            let delay = self.config.backoff_delay(attempt);
            tracing::warn!("Attempt {attempt} for {url} failed ({cause}); retrying in {delay:?}");
            reporter.retrying(target.name, target.version, attempt, delay, &cause);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(FetchError::Cancelled { url: url.to_string() });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt<R: Reporter + ?Sized>(
        &self,
        target: &FetchTarget<'_>,
        file: &mut tokio::fs::File,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<u64, AttemptError> {
        let request = self
            .client
            .get(target.binary.url())
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .timeout(self.config.timeout());

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AttemptError::Cancelled),
            response = request.send() => response.map_err(classify)?,
        };

        let status = response.status();
        if is_transient_status(status) {
            return Err(AttemptError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Permanent(format!("HTTP {status}")));
        }

        let total = response.content_length();
        reporter.downloading(target.name, target.version, 0, total);

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AttemptError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(classify)?;
            file.write_all(&chunk).await.map_err(AttemptError::Io)?;
            downloaded += chunk.len() as u64;
            reporter.downloading(target.name, target.version, downloaded, total);
        }

        if let Some(expected) = total.filter(|&expected| expected != downloaded) {
            return Err(AttemptError::Transient(format!(
                "short body: got {downloaded} of {expected} bytes"
            )));
        }

        file.flush().await.map_err(AttemptError::Io)?;
        file.sync_all().await.map_err(AttemptError::Io)?;
        Ok(downloaded)
    }
}

/// Directory the temporary file is created in: the closest ancestor of
/// `dest` that already exists.
fn staging_dir(dest: &Path) -> PathBuf {
    dest.ancestors()
        .skip(1)
        .find(|dir| !dir.as_os_str().is_empty() && dir.is_dir())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
}

fn classify(err: reqwest::Error) -> AttemptError {
    if err.is_builder() {
        AttemptError::Permanent(err.to_string())
    } else {
        AttemptError::Transient(err.to_string())
    }
}
