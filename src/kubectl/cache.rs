//! Local download cache for kubectl binaries
//!
//! One file per version, named `kubectl<version>` (plus `.exe` on windows),
//! inside a directory that is already specific to the host platform. Two
//! processes therefore agree on the file name for a version without talking
//! to each other.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::kubectl::platform::Platform;
use crate::kubectl::version::KubectlVersion;

pub const KUBECTL_BIN_PREFIX: &str = "kubectl";

/// File name of the cache entry for `version`.
pub fn local_bin_name(version: &KubectlVersion, platform: &Platform) -> String {
    format!("{KUBECTL_BIN_PREFIX}{version}{}", platform.exe_suffix())
}

/// Inverse of [`local_bin_name`]. Returns `None` for names that are not cache
/// entries.
pub fn parse_local_bin_name(name: &str, platform: &Platform) -> Option<KubectlVersion> {
    let stem = name.strip_suffix(platform.exe_suffix()).unwrap_or(name);
    let version = stem.strip_prefix(KUBECTL_BIN_PREFIX)?;
    if !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    KubectlVersion::parse(version).ok()
}

/// The directory holding downloaded kubectl binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCache {
    dir: PathBuf,
    platform: Platform,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            dir: dir.into(),
            platform,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure(&self) -> io::Result<&Path> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(&self.dir)
    }

    pub fn entry_path(&self, version: &KubectlVersion) -> PathBuf {
        self.dir.join(local_bin_name(version, &self.platform))
    }

    /// Every well-formed entry currently in the cache. A missing directory is
    /// an empty cache.
    pub fn entries(&self) -> io::Result<Vec<(PathBuf, KubectlVersion)>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            match parse_local_bin_name(name, &self.platform) {
                Some(version) => entries.push((entry.path(), version)),
                None => debug!("Ignoring unexpected file {:?} in local cache", entry.path()),
            }
        }

        Ok(entries)
    }
}
