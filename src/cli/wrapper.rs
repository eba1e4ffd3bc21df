//! Wrapper mode: resolve the right kubectl and become it

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::cli::logging::LogGuard;
use crate::config::Config;
use crate::kubectl::error::ResolveError;
use crate::kubectl::exec::replace_process;
use crate::kubectl::mirror::KubernetesMirror;
use crate::kubectl::probe::ApiServerProbe;
use crate::kubectl::resolver::VersionResolver;

/// Run kubectl with `args` (without argv[0]). Only returns on failure.
pub fn run(config: &Config, args: Vec<OsString>, log_guard: LogGuard) -> anyhow::Result<Infallible> {
    let binary = super::runtime()?.block_on(resolve(config))?;
    debug!("Running {:?}", binary);

    let env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
    log_guard.flush();

    match replace_process(&binary, &args, &env) {
        Ok(never) => match never {},
        Err(e) => Err(e).with_context(|| format!("cannot run {:?}", binary)),
    }
}

async fn resolve(config: &Config) -> Result<PathBuf, ResolveError> {
    let cache = super::local_cache();
    let finder = Arc::new(super::kubectl_finder(&config.kubectl));
    let mirror = Arc::new(KubernetesMirror::new(&config.kubectl.mirror)?);
    let probe = Arc::new(ApiServerProbe::from_env());
    let resolver = VersionResolver::new(finder, mirror, probe, cache);

    let version = resolver
        .version_to_use(config.kubectl.probe_timeout())
        .await?;
    resolver
        .ensure_available(&version, config.kubectl.allow_download)
        .await
}
