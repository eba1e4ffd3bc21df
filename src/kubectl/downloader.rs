//! Downloader trait for fetching kubectl binaries from an upstream mirror

#[cfg(test)]
use mockall::automock;

use std::path::Path;

use crate::kubectl::error::DownloadError;
use crate::kubectl::version::KubectlVersion;

/// Trait for fetching kubectl releases
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads kubectl `version` for the host platform to `destination`
    ///
    /// The artifact is verified against the mirror's published SHA-256 before
    /// it appears under `destination`; on any failure nothing is left there.
    async fn fetch_binary(
        &self,
        version: &KubectlVersion,
        destination: &Path,
    ) -> Result<(), DownloadError>;

    /// Current stable release as advertised by the mirror
    async fn upstream_stable_version(&self) -> Result<KubectlVersion, DownloadError>;
}
