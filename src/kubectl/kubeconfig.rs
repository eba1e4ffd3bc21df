//! Read-only view of the active cluster in a kubeconfig file
//!
//! Only what is needed to reach the API server's `/version` endpoint is
//! extracted: the server URL and how to trust its certificate.

use std::path::{Path, PathBuf};

use base64::Engine;
use serde::Deserialize;

use crate::kubectl::error::ProbeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Cluster {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: Context,
}

#[derive(Debug, Deserialize)]
struct Context {
    cluster: String,
}

/// API server endpoint of the current context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub server: String,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
}

impl ClusterEndpoint {
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::Kubeconfig(format!("failed to read {path:?}: {e}")))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&contents, base_dir)
    }

    /// Parse kubeconfig `contents`; relative certificate paths are resolved
    /// against `base_dir`.
    pub fn from_yaml(contents: &str, base_dir: &Path) -> Result<Self, ProbeError> {
        let config: Kubeconfig = serde_yaml::from_str(contents)
            .map_err(|e| ProbeError::Kubeconfig(e.to_string()))?;

        let context_name = config
            .current_context
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProbeError::Kubeconfig("current-context is not set".to_string()))?;

        let context = config
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| {
                ProbeError::Kubeconfig(format!("context {context_name:?} not found"))
            })?;

        let cluster = config
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| {
                ProbeError::Kubeconfig(format!(
                    "cluster {:?} not found",
                    context.context.cluster
                ))
            })?;

        let ca_pem = match (&cluster.certificate_authority_data, &cluster.certificate_authority) {
            (Some(data), _) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|e| {
                        ProbeError::Kubeconfig(format!("invalid certificate-authority-data: {e}"))
                    })?,
            ),
            (None, Some(file)) => {
                let file = base_dir.join(file);
                Some(std::fs::read(&file).map_err(|e| {
                    ProbeError::Kubeconfig(format!("failed to read {file:?}: {e}"))
                })?)
            }
            (None, None) => None,
        };

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        })
    }
}

/// Location of the kubeconfig kubectl would use: the first entry of
/// `$KUBECONFIG`, otherwise `~/.kube/config`.
pub fn default_path() -> Option<PathBuf> {
    default_path_with_env(std::env::var_os("KUBECONFIG"), dirs::home_dir())
}

fn default_path_with_env(
    kubeconfig: Option<std::ffi::OsString>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    kubeconfig
        .and_then(|value| std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty()))
        .or_else(|| home_dir.map(|home| home.join(".kube").join("config")))
}
