//! Asking an installed kubectl which version it is

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use wait_timeout::ChildExt;

use crate::config::CLIENT_VERSION_TIMEOUT;
use crate::kubectl::error::QueryError;
use crate::kubectl::version::KubectlVersion;

/// Reads the client version of a kubectl binary on disk
pub trait ClientVersionQuery: Send + Sync {
    fn client_version(&self, path: &Path) -> Result<KubectlVersion, QueryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionOutput {
    client_version: ClientVersion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientVersion {
    git_version: String,
}

/// Runs `kubectl version --client -o json` and reads `clientVersion.gitVersion`.
#[derive(Debug, Clone)]
pub struct ExecClientVersion {
    timeout: Duration,
}

impl ExecClientVersion {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ExecClientVersion {
    fn default() -> Self {
        Self::new(CLIENT_VERSION_TIMEOUT)
    }
}

impl ClientVersionQuery for ExecClientVersion {
    fn client_version(&self, path: &Path) -> Result<KubectlVersion, QueryError> {
        let mut child = Command::new(path)
            .args(["version", "--client", "-o", "json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| QueryError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        // Drained concurrently so a chatty binary cannot stall on a full pipe.
        let stdout = child.stdout.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut out = String::new();
                pipe.read_to_string(&mut out).map(|_| out)
            })
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(QueryError::TimedOut {
                    path: path.to_path_buf(),
                    timeout: self.timeout,
                });
            }
            Err(source) => {
                let _ = child.kill();
                return Err(QueryError::Spawn {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !status.success() {
            return Err(QueryError::Failed {
                path: path.to_path_buf(),
                status: status.to_string(),
            });
        }

        let stdout = match stdout.map(|reader| reader.join()) {
            Some(Ok(read)) => read.map_err(|source| QueryError::Spawn {
                path: path.to_path_buf(),
                source,
            })?,
            Some(Err(_)) => {
                return Err(QueryError::Output {
                    path: path.to_path_buf(),
                    reason: "stdout reader panicked".to_string(),
                });
            }
            None => String::new(),
        };

        parse_version_output(&stdout).map_err(|reason| QueryError::Output {
            path: path.to_path_buf(),
            reason,
        })
    }
}

fn parse_version_output(output: &str) -> Result<KubectlVersion, String> {
    let parsed: VersionOutput = serde_json::from_str(output).map_err(|e| e.to_string())?;
    KubectlVersion::parse(&parsed.client_version.git_version).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECTL_OUTPUT: &str = r#"{
  "clientVersion": {
    "major": "1",
    "minor": "29",
    "gitVersion": "v1.29.2",
    "gitCommit": "4b8e819355d791d96b7e9d9efe4cbafae2311c88",
    "gitTreeState": "clean",
    "buildDate": "2024-02-14T10:40:49Z",
    "goVersion": "go1.21.7",
    "compiler": "gc",
    "platform": "linux/amd64"
  },
  "kustomizeVersion": "v5.0.4-0.20230601165947-6ce0bf390ce3"
}"#;

    #[test]
    fn parse_version_output_reads_git_version() {
        assert_eq!(
            parse_version_output(KUBECTL_OUTPUT),
            Ok(KubectlVersion::new(1, 29, 2))
        );
    }

    #[test]
    fn parse_version_output_rejects_non_json() {
        assert!(parse_version_output("Client Version: v1.29.2").is_err());
    }

    #[cfg(unix)]
    mod exec {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn client_version_runs_the_binary() {
            let dir = TempDir::new().unwrap();
            let path = script(
                &dir,
                "kubectl",
                r#"echo '{"clientVersion": {"gitVersion": "v1.27.4"}}'"#,
            );

            let version = ExecClientVersion::default().client_version(&path).unwrap();

            assert_eq!(version, KubectlVersion::new(1, 27, 4));
        }

        #[test]
        fn client_version_reads_output_larger_than_pipe_buffer() {
            let dir = TempDir::new().unwrap();
            let path = script(
                &dir,
                "kubectl",
                r#"printf '%200000s' ''; echo '{"clientVersion": {"gitVersion": "v1.28.0"}}'"#,
            );

            let version = ExecClientVersion::new(Duration::from_secs(5))
                .client_version(&path)
                .unwrap();

            assert_eq!(version, KubectlVersion::new(1, 28, 0));
        }

        #[test]
        fn client_version_reports_failing_binary() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "kubectl", "exit 3");

            let result = ExecClientVersion::default().client_version(&path);

            assert!(matches!(result, Err(QueryError::Failed { .. })));
        }

        #[test]
        fn client_version_kills_hung_binary() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "kubectl", "sleep 10");

            let result =
                ExecClientVersion::new(Duration::from_millis(200)).client_version(&path);

            assert!(matches!(result, Err(QueryError::TimedOut { .. })));
        }
    }
}
