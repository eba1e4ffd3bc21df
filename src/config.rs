use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::kubectl::mirror::DEFAULT_MIRROR_URL;
use crate::kubectl::platform::Platform;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default timeout for the cluster version probe in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Timeout for establishing a connection to the release mirror
pub const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a whole mirror request, including the binary download
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for `kubectl version --client` on an installed binary
pub const CLIENT_VERSION_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Locations
// =============================================================================

/// Name of the configuration file looked up in every config directory
pub const CONFIG_FILE_NAME: &str = "kubewrap.yaml";

/// Extra config directory with the highest precedence
pub const CONFIG_DIR_ENV: &str = "KUBEWRAP_CONFIG_DIR";

/// Overrides the data directory (`~/.kubewrap`)
pub const HOME_ENV: &str = "KUBEWRAP_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Effective configuration after all config files are merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub kubectl: KubectlConfig,
}

/// kubectl wrapper settings
#[derive(Debug, Clone, PartialEq)]
pub struct KubectlConfig {
    /// Whether missing kubectl versions may be fetched from the mirror
    pub allow_download: bool,
    /// PATH-style list of directories searched for installed kubectl
    /// binaries. `None` means the `PATH` environment variable.
    pub system_path: Option<String>,
    /// Cluster version probe timeout in seconds
    pub timeout: u64,
    /// Base URL of the Kubernetes release mirror
    pub mirror: String,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            allow_download: true,
            system_path: None,
            timeout: DEFAULT_PROBE_TIMEOUT_SECS,
            mirror: DEFAULT_MIRROR_URL.to_string(),
        }
    }
}

impl KubectlConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Directories to scan for system kubectl binaries
    pub fn system_paths(&self) -> Vec<PathBuf> {
        system_paths_with_env(self.system_path.as_deref(), std::env::var_os("PATH"))
    }
}

fn system_paths_with_env(system_path: Option<&str>, path_env: Option<OsString>) -> Vec<PathBuf> {
    let joined = match system_path {
        Some(system_path) if !system_path.is_empty() => OsString::from(system_path),
        _ => path_env.unwrap_or_default(),
    };

    std::env::split_paths(&joined)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// On-disk shape of a config file. Every field is optional so that a file
/// only overrides what it mentions.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
    kubectl: KubectlOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct KubectlOverrides {
    allow_download: Option<bool>,
    system_path: Option<String>,
    timeout: Option<u64>,
    mirror: Option<String>,
}

impl KubectlOverrides {
    fn apply(self, config: &mut KubectlConfig) {
        if let Some(allow_download) = self.allow_download {
            config.allow_download = allow_download;
        }
        if let Some(system_path) = self.system_path {
            config.system_path = Some(system_path);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(mirror) = self.mirror {
            config.mirror = mirror;
        }
    }
}

/// Loads `kubewrap.yaml` from a list of directories, later ones overriding
/// earlier ones field by field.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            paths: default_config_dirs(),
        }
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        for dir in &self.paths {
            let path = dir.join(CONFIG_FILE_NAME);
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(ConfigError::Io { path, source }),
            };

            // An empty file is a valid, empty config.
            if contents.trim().is_empty() {
                continue;
            }

            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|source| ConfigError::Parse { path, source })?;
            file.kubectl.apply(&mut config.kubectl);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Config directories in increasing order of precedence
pub fn default_config_dirs() -> Vec<PathBuf> {
    let mut dirs = system_config_dirs();
    dirs.push(data_dir());
    if let Some(extra) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(extra));
    }
    dirs
}

#[cfg(unix)]
fn system_config_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/etc/kubewrap"),
        PathBuf::from("/etc/kubewrap"),
    ]
}

#[cfg(not(unix))]
fn system_config_dirs() -> Vec<PathBuf> {
    ["PROGRAMDATA", "APPDATA"]
        .iter()
        .filter_map(std::env::var_os)
        .map(|base| PathBuf::from(base).join("kubewrap"))
        .collect()
}

/// Returns the path to the data directory for kubewrap.
/// Uses $KUBEWRAP_HOME if set, otherwise ~/.kubewrap,
/// or ./.kubewrap if no home directory is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var(HOME_ENV).ok(), dirs::home_dir())
}

/// Returns the local download directory for kubectl binaries of `platform`.
pub fn local_download_dir(platform: &Platform) -> PathBuf {
    local_download_dir_in(&data_dir(), platform)
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("kubewrap.log")
}

fn local_download_dir_in(data_dir: &Path, platform: &Platform) -> PathBuf {
    data_dir.join("bin").join(platform.key())
}

fn data_dir_with_env(kubewrap_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    kubewrap_home
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".kubewrap")))
        .unwrap_or_else(|| PathBuf::from(".kubewrap"))
}
