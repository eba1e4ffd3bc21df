//! Querying the version of the cluster kubectl is pointed at

#[cfg(test)]
use mockall::automock;

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::kubectl::error::ProbeError;
use crate::kubectl::kubeconfig::{self, ClusterEndpoint};
use crate::kubectl::version::KubectlVersion;

/// Trait for asking a live cluster which Kubernetes version it runs
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ClusterVersionProbe: Send + Sync {
    /// Returns the control plane version, giving up after `timeout`
    ///
    /// Errors for which [`ProbeError::is_timeout`] holds mean the cluster
    /// could not be reached.
    async fn version(&self, timeout: Duration) -> Result<KubectlVersion, ProbeError>;
}

/// Response of the API server's `/version` endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerVersion {
    git_version: String,
}

/// Probe that calls `GET <server>/version` on the current kubeconfig context
#[derive(Debug, Clone)]
pub struct ApiServerProbe {
    kubeconfig: Option<PathBuf>,
}

impl ApiServerProbe {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }

    /// Uses the kubeconfig kubectl itself would pick up
    pub fn from_env() -> Self {
        Self::new(kubeconfig::default_path())
    }

    fn client(endpoint: &ClusterEndpoint, timeout: Duration) -> Result<reqwest::Client, ProbeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("kubewrap/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout);

        if endpoint.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(pem) = &endpoint.ca_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(|e| {
                ProbeError::Kubeconfig(format!("invalid certificate authority: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| ProbeError::Kubeconfig(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait::async_trait]
impl ClusterVersionProbe for ApiServerProbe {
    async fn version(&self, timeout: Duration) -> Result<KubectlVersion, ProbeError> {
        let path = self
            .kubeconfig
            .as_deref()
            .ok_or_else(|| ProbeError::Kubeconfig("no kubeconfig location".to_string()))?;
        let endpoint = ClusterEndpoint::load(path)?;
        let client = Self::client(&endpoint, timeout)?;

        let url = format!("{}/version", endpoint.server);
        debug!("Probing cluster version at {}", url);

        let response = client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else if e.is_connect() {
                ProbeError::Unreachable(e.to_string())
            } else {
                ProbeError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::InvalidResponse(format!(
                "Unexpected status: {status}"
            )));
        }

        let info: ServerVersion = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::InvalidResponse(e.to_string())
            }
        })?;

        // Vendor builds (`-eks-...`, `+k3s1`) are served by the plain release.
        KubectlVersion::parse(&info.git_version)
            .map(|version| version.release())
            .map_err(|e| ProbeError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    fn write_kubeconfig(dir: &TempDir, server: &str) -> PathBuf {
        let path = dir.path().join("config");
        let contents = format!(
            r#"
clusters:
- name: test
  cluster:
    server: {server}
contexts:
- name: test
  context:
    cluster: test
current-context: test
"#
        );
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn version_reads_git_version_without_vendor_suffix() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/version")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "major": "1",
                    "minor": "21+",
                    "gitVersion": "v1.21.3-eks-0389ca3",
                    "platform": "linux/amd64"
                }"#,
            )
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let probe = ApiServerProbe::new(Some(write_kubeconfig(&dir, &server.url())));

        let version = probe.version(Duration::from_secs(5)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(version, KubectlVersion::new(1, 21, 3));
    }

    #[tokio::test]
    async fn version_reports_forbidden_as_non_timeout() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/version")
            .with_status(403)
            .with_body(r#"{"kind": "Status", "reason": "Forbidden"}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let probe = ApiServerProbe::new(Some(write_kubeconfig(&dir, &server.url())));

        let err = probe.version(Duration::from_secs(5)).await.unwrap_err();

        assert!(matches!(err, ProbeError::InvalidResponse(_)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn version_reports_unreachable_server_as_timeout() {
        // Bind then drop a listener so the port is known to refuse connections.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dir = TempDir::new().unwrap();
        let probe = ApiServerProbe::new(Some(write_kubeconfig(
            &dir,
            &format!("http://127.0.0.1:{port}"),
        )));

        let err = probe.version(Duration::from_secs(2)).await.unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn version_without_kubeconfig_is_not_a_timeout() {
        let dir = TempDir::new().unwrap();
        let probe = ApiServerProbe::new(Some(dir.path().join("missing")));

        let err = probe.version(Duration::from_secs(1)).await.unwrap_err();

        assert!(matches!(err, ProbeError::Kubeconfig(_)));
        assert!(!err.is_timeout());
    }
}
