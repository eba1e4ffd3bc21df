use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::kubectl::version::KubectlVersion;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version {input:?}: {reason}")]
    Parse { input: String, reason: String },
}

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("no kubectl binary compatible with version {0} found")]
    NoCompatibleBinary(KubectlVersion),

    #[error("no kubectl binary found")]
    NoVersionFound,

    #[error("failed to scan {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FinderError {
    pub fn is_no_version_found(&self) -> bool {
        matches!(self, Self::NoVersionFound)
    }
}

/// Failure while asking an on-disk kubectl for its client version
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to run {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} did not answer within {timeout:?}")]
    TimedOut { path: PathBuf, timeout: Duration },

    #[error("{path:?} exited with {status}")]
    Failed { path: PathBuf, status: String },

    #[error("unexpected version output from {path:?}: {reason}")]
    Output { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("SHA mismatch for URL {url}: expected '{expected}', got '{actual}'")]
    ShaMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("upstream mirror unavailable at {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DownloadError {
    pub fn is_sha_mismatch(&self) -> bool {
        matches!(self, Self::ShaMismatch { .. })
    }

    /// True when the mirror could not be reached or answered with something
    /// unusable. Local failures and checksum mismatches are not included.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::Network(_) | Self::InvalidResponse(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("kubernetes API server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("kubernetes API server unreachable: {0}")]
    Unreachable(String),

    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProbeError {
    /// True when the cluster could not be reached at all, as opposed to
    /// answering with something unusable.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unreachable(_))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "the right kubectl is missing, binary downloads from the upstream mirror are disabled"
    )]
    DownloadDisabled,

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Finder(#[from] FinderError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("kubectl binary not found at {0:?}")]
    NotFound(PathBuf),

    #[error("failed to execute {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
