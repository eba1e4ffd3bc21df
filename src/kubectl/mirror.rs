//! Kubernetes release mirror (dl.k8s.io) downloader implementation

use std::path::Path;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::{DOWNLOAD_CONNECT_TIMEOUT, DOWNLOAD_TIMEOUT};
use crate::kubectl::downloader::Downloader;
use crate::kubectl::error::DownloadError;
use crate::kubectl::platform::Platform;
use crate::kubectl::version::KubectlVersion;

/// Default base URL for Kubernetes release artifacts
pub const DEFAULT_MIRROR_URL: &str = "https://dl.k8s.io";

/// Downloader for the official Kubernetes release layout:
/// - `<base>/release/stable.txt`
/// - `<base>/release/v<version>/bin/<os>/<arch>/kubectl[.exe]`
/// - `<artifact url>.sha256`
pub struct KubernetesMirror {
    client: reqwest::Client,
    base_url: String,
    platform: Platform,
}

impl KubernetesMirror {
    /// Creates a mirror client for `base_url` targeting the host platform
    pub fn new(base_url: &str) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kubewrap/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            platform: Platform::current(),
        })
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn stable_url(&self) -> String {
        format!("{}/release/stable.txt", self.base_url)
    }

    pub fn artifact_url(&self, version: &KubectlVersion) -> String {
        format!(
            "{}/release/v{}/bin/{}/{}/kubectl{}",
            self.base_url,
            version,
            self.platform.os,
            self.platform.arch,
            self.platform.exe_suffix()
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("Mirror returned status {}: {}", status, url);
            return Err(DownloadError::UpstreamUnavailable {
                url: url.to_string(),
                reason: format!("Unexpected status: {status}"),
            });
        }

        Ok(response)
    }

    async fn expected_sha256(&self, artifact_url: &str) -> Result<String, DownloadError> {
        let url = format!("{artifact_url}.sha256");
        let body = self.get(&url).await?.text().await?;

        let digest = body
            .split_whitespace()
            .next()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DownloadError::InvalidResponse(format!(
                "malformed checksum from {url}: {body:?}"
            )));
        }

        Ok(digest)
    }
}

#[async_trait::async_trait]
impl Downloader for KubernetesMirror {
    async fn fetch_binary(
        &self,
        version: &KubectlVersion,
        destination: &Path,
    ) -> Result<(), DownloadError> {
        let url = self.artifact_url(version);
        info!("Downloading {} to {:?}", url, destination);

        let expected = self.expected_sha256(&url).await?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        // Lives next to the destination so the final rename stays on one filesystem.
        let partial = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(".kubectl-download")
                .tempfile_in(parent)
        })
        .await
        .map_err(std::io::Error::other)??;
        let (file, partial_path) = partial.into_parts();
        let mut file = File::from_std(file);
        let mut hasher = Sha256::new();

        let mut stream = self.get(&url).await?.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }
        file.sync_all().await?;
        drop(file);

        let actual = hex::encode(hasher.finalize());
        if actual != expected {
            warn!("Checksum mismatch for {}, discarding download", url);
            return Err(DownloadError::ShaMismatch {
                url,
                expected,
                actual,
            });
        }

        // Replaces whatever is at `destination`; the last verified writer wins.
        let target = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            make_executable(&partial_path)?;
            partial_path.persist(&target).map_err(|e| e.error)
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("kubectl {} stored at {:?}", version, destination);
        Ok(())
    }

    async fn upstream_stable_version(&self) -> Result<KubectlVersion, DownloadError> {
        let url = self.stable_url();
        let body = self.get(&url).await?.text().await?;

        KubectlVersion::parse(&body).map_err(|e| {
            warn!("Failed to parse stable release pointer: {}", e);
            DownloadError::InvalidResponse(e.to_string())
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
