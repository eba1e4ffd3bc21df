//! Deciding which kubectl version to run and making sure it is on disk
//!
//! Version selection is a small state machine:
//!
//! ```text
//! ProbeCluster ──ok──────────────────────────────────────────▶ Done
//!      │ err
//!      ▼
//! ProbeLocal ──found─────────────────────────────────────────▶ Done
//!      │ NoVersionFound            │ other error
//!      ▼                           ▼
//! ProbeUpstream ──ok──▶ Done     Failed(cluster probe error)
//!      │ err
//!      ▼
//! Failed(cluster probe error)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::kubectl::cache::LocalCache;
use crate::kubectl::downloader::Downloader;
use crate::kubectl::error::{DownloadError, FinderError, ProbeError, ResolveError};
use crate::kubectl::finder::BinaryFinder;
use crate::kubectl::probe::ClusterVersionProbe;
use crate::kubectl::version::KubectlVersion;

#[derive(Debug)]
enum ResolveState {
    ProbeCluster,
    ProbeLocal(ProbeError),
    ProbeUpstream(ProbeError),
    Done(KubectlVersion),
    Failed(ResolveError),
}

/// Coordinates the cluster probe, the binary finder and the downloader.
pub struct VersionResolver {
    finder: Arc<dyn BinaryFinder>,
    downloader: Arc<dyn Downloader>,
    probe: Arc<dyn ClusterVersionProbe>,
    cache: LocalCache,
}

impl VersionResolver {
    pub fn new(
        finder: Arc<dyn BinaryFinder>,
        downloader: Arc<dyn Downloader>,
        probe: Arc<dyn ClusterVersionProbe>,
        cache: LocalCache,
    ) -> Self {
        Self {
            finder,
            downloader,
            probe,
            cache,
        }
    }

    /// The kubectl version to use against the current cluster.
    ///
    /// A reachable cluster decides. Otherwise the newest local binary is good
    /// enough, and with nothing local the mirror's stable release is used.
    /// When every fallback fails the cluster probe error is returned.
    pub async fn version_to_use(&self, timeout: Duration) -> Result<KubectlVersion, ResolveError> {
        let mut state = ResolveState::ProbeCluster;

        loop {
            state = match state {
                ResolveState::ProbeCluster => match self.probe.version(timeout).await {
                    Ok(version) => ResolveState::Done(version),
                    Err(err) => {
                        if err.is_timeout() {
                            info!("Remote kubernetes server unreachable");
                        } else {
                            warn!("Failed to query cluster version: {}", err);
                        }
                        ResolveState::ProbeLocal(err)
                    }
                },
                ResolveState::ProbeLocal(probe_err) => match self.finder.most_recent_available() {
                    Ok(binary) => ResolveState::Done(binary.version),
                    Err(FinderError::NoVersionFound) => {
                        info!("No local kubectl binary found, fetching latest stable release version");
                        ResolveState::ProbeUpstream(probe_err)
                    }
                    Err(err) => {
                        warn!("Failed to look up local kubectl binaries: {}", err);
                        ResolveState::Failed(probe_err.into())
                    }
                },
                ResolveState::ProbeUpstream(probe_err) => {
                    match self.downloader.upstream_stable_version().await {
                        Ok(version) => ResolveState::Done(version),
                        Err(err) if err.is_upstream_unavailable() => {
                            warn!("Release mirror unavailable: {}", err);
                            ResolveState::Failed(probe_err.into())
                        }
                        Err(err) => {
                            warn!("Failed to fetch latest stable kubectl version: {}", err);
                            ResolveState::Failed(probe_err.into())
                        }
                    }
                }
                ResolveState::Done(version) => {
                    debug!("Using kubectl version {}", version);
                    return Ok(version);
                }
                ResolveState::Failed(err) => return Err(err),
            };
        }
    }

    /// Path of a kubectl compatible with `version`, downloading it into the
    /// local cache when none is installed and `allow_download` is set.
    pub async fn ensure_available(
        &self,
        version: &KubectlVersion,
        allow_download: bool,
    ) -> Result<PathBuf, ResolveError> {
        match self.finder.find_compatible(version) {
            Ok(binary) => return Ok(binary.path),
            Err(err) => debug!("{}", err),
        }

        if !allow_download {
            return Err(ResolveError::DownloadDisabled);
        }

        info!("Right kubectl missing, downloading version {}", version);

        self.cache.ensure().map_err(DownloadError::Io)?;
        let destination = self.cache.entry_path(version);
        self.downloader.fetch_binary(version, &destination).await?;

        Ok(destination)
    }
}
