//! Command line surface
//!
//! Everything on the command line belongs to kubectl except two reserved
//! subcommands that manage the kubectl binaries themselves.
//!
//! # Modules
//!
//! - [`bins`]: `bins`, lists the kubectl binaries found
//! - [`get_bin`]: `get-bin <version>`, downloads a specific kubectl
//! - [`wrapper`]: everything else, forwarded to the right kubectl
//! - [`logging`]: tracing subscriber setup

pub mod bins;
pub mod get_bin;
pub mod logging;
pub mod wrapper;

use std::ffi::OsString;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{ConfigLoader, KubectlConfig, local_download_dir};
use crate::kubectl::cache::LocalCache;
use crate::kubectl::finder::KubectlFinder;
use crate::kubectl::platform::Platform;

pub const LIST_BINS_CMD: &str = "bins";
pub const GET_BIN_CMD: &str = "get-bin";

#[derive(Parser)]
#[command(name = "kubewrap")]
#[command(
    version,
    about = "Run the kubectl matching the current cluster",
    long_about = "kubewrap forwards its arguments to the kubectl version matching the cluster \
                  in the current kubeconfig context, downloading it when needed.\n\n\
                  Two subcommands are handled by kubewrap itself: `bins` and `get-bin`."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print information about the kubectl binaries found
    Bins,

    /// Download the kubectl version specified
    #[command(
        name = "get-bin",
        after_help = "Examples:\n  \
                      Download version 1.20.0, the patch version is inferred:\n    \
                      kubewrap get-bin 1.20\n\n  \
                      Versions can be given with or without the 'v' prefix:\n    \
                      kubewrap get-bin v1.19.1"
    )]
    GetBin {
        /// Version to download, e.g. 1.29.2 or v1.29
        version: String,
    },
}

/// Whether `args` (including argv[0]) invoke a reserved subcommand rather
/// than kubectl.
pub fn is_reserved(args: &[OsString]) -> bool {
    args.get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| arg == LIST_BINS_CMD || arg == GET_BIN_CMD)
}

/// Entry point shared by the binary. `args` includes argv[0].
pub fn run(args: Vec<OsString>) -> anyhow::Result<()> {
    let log_guard = logging::init();
    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;

    if !is_reserved(&args) {
        let kubectl_args = args.into_iter().skip(1).collect();
        return wrapper::run(&config, kubectl_args, log_guard).map(|never| match never {});
    }

    match Cli::parse_from(args).command {
        Command::Bins => {
            print!("{}", bins::render(&kubectl_finder(&config.kubectl)));
            Ok(())
        }
        Command::GetBin { version } => {
            let path = runtime()?.block_on(get_bin::run(&config, &version))?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn local_cache() -> LocalCache {
    let platform = Platform::current();
    LocalCache::new(local_download_dir(&platform), platform)
}

fn kubectl_finder(config: &KubectlConfig) -> KubectlFinder {
    KubectlFinder::new(config.system_paths(), local_cache())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case(&["kubectl", "bins"], true)]
    #[case(&["kubectl", "get-bin", "1.20"], true)]
    #[case(&["kubectl", "get", "pods"], false)]
    #[case(&["kubectl", "--context", "bins"], false)]
    #[case(&["kubectl"], false)]
    fn is_reserved_only_checks_first_argument(#[case] list: &[&str], #[case] expected: bool) {
        assert_eq!(is_reserved(&args(list)), expected);
    }

    #[test]
    fn cli_parses_get_bin_version() {
        let cli = Cli::try_parse_from(args(&["kubewrap", "get-bin", "v1.19.1"])).unwrap();

        assert!(matches!(cli.command, Command::GetBin { version } if version == "v1.19.1"));
    }

    #[test]
    fn cli_requires_version_for_get_bin() {
        assert!(Cli::try_parse_from(args(&["kubewrap", "get-bin"])).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
