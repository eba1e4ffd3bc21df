//! Test doubles for the resolver's collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use kubewrap::kubectl::cache::LocalCache;
use kubewrap::kubectl::client_version::ClientVersionQuery;
use kubewrap::kubectl::downloader::Downloader;
use kubewrap::kubectl::error::{DownloadError, ProbeError, QueryError};
use kubewrap::kubectl::platform::Platform;
use kubewrap::kubectl::probe::ClusterVersionProbe;
use kubewrap::kubectl::version::KubectlVersion;

pub const LINUX: Platform = Platform {
    os: "linux",
    arch: "amd64",
};

pub fn v(version: &str) -> KubectlVersion {
    KubectlVersion::parse(version).unwrap()
}

enum ProbeAnswer {
    Version(KubectlVersion),
    Timeout,
    NoContext,
}

/// Cluster probe answering with a fixed result
pub struct FakeProbe(ProbeAnswer);

impl FakeProbe {
    pub fn reachable(version: &str) -> Self {
        Self(ProbeAnswer::Version(v(version)))
    }

    pub fn unreachable() -> Self {
        Self(ProbeAnswer::Timeout)
    }

    pub fn misconfigured() -> Self {
        Self(ProbeAnswer::NoContext)
    }
}

#[async_trait]
impl ClusterVersionProbe for FakeProbe {
    async fn version(&self, timeout: Duration) -> Result<KubectlVersion, ProbeError> {
        match &self.0 {
            ProbeAnswer::Version(version) => Ok(version.clone()),
            ProbeAnswer::Timeout => Err(ProbeError::Timeout(timeout)),
            ProbeAnswer::NoContext => Err(ProbeError::Kubeconfig("no current context".to_string())),
        }
    }
}

/// Downloader that writes a placeholder executable and records each request
#[derive(Default)]
pub struct FakeDownloader {
    stable: Option<KubectlVersion>,
    fail_fetch: bool,
    fetched: Mutex<Vec<(KubectlVersion, PathBuf)>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stable(mut self, version: &str) -> Self {
        self.stable = Some(v(version));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn fetched(&self) -> Vec<(KubectlVersion, PathBuf)> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch_binary(
        &self,
        version: &KubectlVersion,
        destination: &Path,
    ) -> Result<(), DownloadError> {
        self.fetched
            .lock()
            .unwrap()
            .push((version.clone(), destination.to_path_buf()));

        if self.fail_fetch {
            return Err(DownloadError::UpstreamUnavailable {
                url: format!("https://mirror.test/release/v{version}/bin/linux/amd64/kubectl"),
                reason: "503 Service Unavailable".to_string(),
            });
        }

        write_executable(destination, "#!/bin/sh\n");
        Ok(())
    }

    async fn upstream_stable_version(&self) -> Result<KubectlVersion, DownloadError> {
        self.stable
            .clone()
            .ok_or_else(|| DownloadError::InvalidResponse("no stable version".to_string()))
    }
}

/// Client version query keyed by file name
pub struct FakeQuery {
    versions: HashMap<PathBuf, KubectlVersion>,
}

impl FakeQuery {
    pub fn new(versions: &[(&PathBuf, &str)]) -> Self {
        Self {
            versions: versions
                .iter()
                .map(|(path, version)| ((*path).clone(), v(version)))
                .collect(),
        }
    }
}

impl ClientVersionQuery for FakeQuery {
    fn client_version(&self, path: &Path) -> Result<KubectlVersion, QueryError> {
        self.versions
            .get(path)
            .cloned()
            .ok_or_else(|| QueryError::Output {
                path: path.to_path_buf(),
                reason: "unknown binary".to_string(),
            })
    }
}

/// A temporary layout with a system directory and a cache directory
pub struct Sandbox {
    pub root: TempDir,
    pub system_dir: PathBuf,
    pub cache: LocalCache,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let system_dir = root.path().join("usr/bin");
        std::fs::create_dir_all(&system_dir).unwrap();
        let cache = LocalCache::new(root.path().join("home/.kubewrap/bin/linux-amd64"), LINUX);
        Self {
            root,
            system_dir,
            cache,
        }
    }

    /// Place a cached kubectl of `version`
    pub fn cache_binary(&self, version: &str) -> PathBuf {
        self.cache.ensure().unwrap();
        let path = self.cache.entry_path(&v(version));
        write_executable(&path, "#!/bin/sh\n");
        path
    }

    /// Place an executable file named `name` in the system directory
    pub fn system_binary(&self, name: &str) -> PathBuf {
        let path = self.system_dir.join(name);
        write_executable(&path, "#!/bin/sh\n");
        path
    }
}

pub fn write_executable(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
