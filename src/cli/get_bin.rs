//! `get-bin <version>`: download a specific kubectl into the local cache

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::kubectl::cache::LocalCache;
use crate::kubectl::downloader::Downloader;
use crate::kubectl::mirror::KubernetesMirror;
use crate::kubectl::version::KubectlVersion;

/// Download `version` from the configured mirror. The download setting in
/// the config file does not apply to an explicit request.
pub async fn run(config: &Config, version: &str) -> anyhow::Result<PathBuf> {
    let mirror = KubernetesMirror::new(&config.kubectl.mirror)?;
    download(&mirror, &super::local_cache(), version).await
}

pub async fn download(
    downloader: &dyn Downloader,
    cache: &LocalCache,
    version: &str,
) -> anyhow::Result<PathBuf> {
    let version = KubectlVersion::parse(version).context("invalid version")?;

    cache
        .ensure()
        .with_context(|| format!("cannot create download directory {:?}", cache.dir()))?;

    let destination = cache.entry_path(&version);
    info!("Downloading kubectl {} to {:?}", version, destination);
    downloader.fetch_binary(&version, &destination).await?;

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubectl::downloader::MockDownloader;
    use crate::kubectl::platform::Platform;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    const LINUX: Platform = Platform {
        os: "linux",
        arch: "amd64",
    };

    #[tokio::test]
    async fn download_pads_version_and_targets_cache_entry() {
        let dir = tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("bin/linux-amd64"), LINUX);
        let expected = cache.entry_path(&KubectlVersion::new(1, 20, 0));

        let mut downloader = MockDownloader::new();
        downloader
            .expect_fetch_binary()
            .with(eq(KubectlVersion::new(1, 20, 0)), eq(expected.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        let path = download(&downloader, &cache, "v1.20").await.unwrap();

        assert_eq!(path, expected);
        assert!(cache.dir().is_dir());
    }

    #[tokio::test]
    async fn download_rejects_invalid_version_without_fetching() {
        let dir = tempdir().unwrap();
        let cache = LocalCache::new(dir.path(), LINUX);

        let mut downloader = MockDownloader::new();
        downloader.expect_fetch_binary().never();

        let err = download(&downloader, &cache, "latest").await.unwrap_err();

        assert!(format!("{err:#}").starts_with("invalid version: "));
    }
}
