//! Locating kubectl binaries on the system and in the local cache

#[cfg(test)]
use mockall::automock;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::kubectl::binary::{KubectlBinaries, KubectlBinary};
use crate::kubectl::cache::{KUBECTL_BIN_PREFIX, LocalCache};
use crate::kubectl::client_version::{ClientVersionQuery, ExecClientVersion};
use crate::kubectl::error::FinderError;
use crate::kubectl::version::KubectlVersion;

/// Trait for discovering kubectl binaries
#[cfg_attr(test, automock)]
pub trait BinaryFinder: Send + Sync {
    /// Binaries installed in the system search directories
    fn system_binaries(&self) -> Result<KubectlBinaries, FinderError>;

    /// Binaries in the local download cache
    fn local_binaries(&self) -> Result<KubectlBinaries, FinderError>;

    /// System and local binaries sorted by version, newest first when
    /// `reverse_sort` is set. Sources that fail to scan contribute nothing.
    fn all_binaries(&self, reverse_sort: bool) -> KubectlBinaries;

    /// The binary to use against a server running `requested`
    fn find_compatible(&self, requested: &KubectlVersion) -> Result<KubectlBinary, FinderError>;

    /// The newest binary available anywhere
    fn most_recent_available(&self) -> Result<KubectlBinary, FinderError>;
}

/// Production [`BinaryFinder`] backed by the filesystem
pub struct KubectlFinder {
    system_paths: Vec<PathBuf>,
    cache: LocalCache,
    query: Box<dyn ClientVersionQuery>,
    self_exe: Option<PathBuf>,
}

impl KubectlFinder {
    pub fn new(system_paths: Vec<PathBuf>, cache: LocalCache) -> Self {
        let self_exe = std::env::current_exe()
            .and_then(|exe| exe.canonicalize())
            .ok();

        Self {
            system_paths,
            cache,
            query: Box::new(ExecClientVersion::default()),
            self_exe,
        }
    }

    /// Replace the way system binaries are asked for their version
    pub fn with_query(mut self, query: impl ClientVersionQuery + 'static) -> Self {
        self.query = Box::new(query);
        self
    }

    /// Treat `exe` as the running executable, which is never reported as a
    /// kubectl binary
    pub fn with_self_exe(mut self, exe: Option<PathBuf>) -> Self {
        self.self_exe = exe.and_then(|exe| exe.canonicalize().ok());
        self
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    fn is_kubectl_name(&self, name: &str) -> bool {
        let stem = name
            .strip_suffix(self.cache.platform().exe_suffix())
            .unwrap_or(name);
        match stem.strip_prefix(KUBECTL_BIN_PREFIX) {
            Some("") => true,
            Some(rest) => rest.starts_with(|c: char| c.is_ascii_digit()),
            None => false,
        }
    }

    fn is_self(&self, path: &Path) -> bool {
        match (&self.self_exe, path.canonicalize()) {
            (Some(self_exe), Ok(candidate)) => *self_exe == candidate,
            _ => false,
        }
    }

    /// Scan one search directory. Unreadable directories contribute nothing.
    fn scan_system_dir(&self, dir: &Path) -> Vec<KubectlBinary> {
        let read_dir = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("System path {:?} does not exist", dir);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to scan {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(|name| self.is_kubectl_name(name)) {
                continue;
            }

            let path = entry.path();
            if !is_executable_file(&path) {
                continue;
            }
            if self.is_self(&path) {
                debug!("Skipping {:?}, it is this executable", path);
                continue;
            }

            match self.query.client_version(&path) {
                Ok(version) => found.push(KubectlBinary::new(path, version)),
                Err(e) => warn!("Skipping kubectl binary {:?}: {}", path, e),
            }
        }

        found
    }
}

impl BinaryFinder for KubectlFinder {
    fn system_binaries(&self) -> Result<KubectlBinaries, FinderError> {
        Ok(self
            .system_paths
            .iter()
            .flat_map(|dir| self.scan_system_dir(dir))
            .collect())
    }

    fn local_binaries(&self) -> Result<KubectlBinaries, FinderError> {
        let entries = self.cache.entries().map_err(|source| FinderError::Io {
            path: self.cache.dir().to_path_buf(),
            source,
        })?;

        Ok(entries
            .into_iter()
            .map(|(path, version)| KubectlBinary::new(path, version))
            .collect())
    }

    fn all_binaries(&self, reverse_sort: bool) -> KubectlBinaries {
        let mut binaries = self.system_binaries().unwrap_or_else(|e| {
            warn!("Failed to scan system kubectl binaries: {}", e);
            KubectlBinaries::default()
        });
        match self.local_binaries() {
            Ok(local) => binaries.append(local),
            Err(e) => warn!("Failed to scan local kubectl binaries: {}", e),
        }

        binaries.sorted(reverse_sort)
    }

    fn find_compatible(&self, requested: &KubectlVersion) -> Result<KubectlBinary, FinderError> {
        self.all_binaries(true)
            .compatible_with(requested)
            .cloned()
            .ok_or_else(|| FinderError::NoCompatibleBinary(requested.clone()))
    }

    fn most_recent_available(&self) -> Result<KubectlBinary, FinderError> {
        self.all_binaries(true)
            .most_recent()
            .cloned()
            .ok_or(FinderError::NoVersionFound)
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
