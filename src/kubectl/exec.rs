//! Handing the current process over to the resolved kubectl

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::kubectl::error::ExecError;

/// Replace the running process with `binary`, passing `args` (without argv[0])
/// and exactly the environment in `env`.
///
/// On unix this is `execve`: the pid, stdio and exit status become kubectl's
/// and the call only returns on failure. Elsewhere kubectl runs as a child
/// with inherited stdio and this process exits with the child's exit code.
pub fn replace_process(
    binary: &Path,
    args: &[OsString],
    env: &[(OsString, OsString)],
) -> Result<Infallible, ExecError> {
    let binary = resolve_binary(binary)?;
    debug!("Executing {:?} with {} argument(s)", binary, args.len());

    let mut command = Command::new(&binary);
    command
        .args(args)
        .env_clear()
        .envs(env.iter().map(|(key, value)| (key, value)));

    imp::replace(command, &binary)
}

fn resolve_binary(binary: &Path) -> Result<PathBuf, ExecError> {
    match std::fs::metadata(binary) {
        Ok(meta) if meta.is_file() => Ok(binary.to_path_buf()),
        Ok(_) => Err(ExecError::NotFound(binary.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExecError::NotFound(binary.to_path_buf()))
        }
        Err(source) => Err(ExecError::Io {
            path: binary.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
mod imp {
    use std::convert::Infallible;
    use std::os::unix::process::CommandExt;
    use std::path::Path;
    use std::process::Command;

    use crate::kubectl::error::ExecError;

    pub(super) fn replace(mut command: Command, binary: &Path) -> Result<Infallible, ExecError> {
        let source = command.exec();
        Err(ExecError::Io {
            path: binary.to_path_buf(),
            source,
        })
    }
}

#[cfg(not(unix))]
mod imp {
    use std::convert::Infallible;
    use std::path::Path;
    use std::process::Command;

    use tracing::warn;

    use crate::kubectl::error::ExecError;

    pub(super) fn replace(mut command: Command, binary: &Path) -> Result<Infallible, ExecError> {
        // Ctrl-C reaches the whole console group; the child decides what to do with it.
        if let Err(e) = ctrlc::set_handler(|| {}) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }

        let status = command.status().map_err(|source| ExecError::Io {
            path: binary.to_path_buf(),
            source,
        })?;
        std::process::exit(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replace_process_rejects_missing_binary() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("kubectl1.21.0");

        let result = replace_process(&missing, &[], &[]);

        assert!(matches!(result, Err(ExecError::NotFound(path)) if path == missing));
    }

    #[test]
    fn replace_process_rejects_directories() {
        let dir = TempDir::new().unwrap();

        let result = replace_process(dir.path(), &[], &[]);

        assert!(matches!(result, Err(ExecError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn replace_process_reports_non_executable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kubectl");
        std::fs::write(&path, b"not a program").unwrap();

        let result = replace_process(&path, &[], &[]);

        assert!(matches!(result, Err(ExecError::Io { .. })));
    }
}
