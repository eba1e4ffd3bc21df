//! tracing subscriber setup
//!
//! Two sinks: stderr, quiet by default so wrapped kubectl output stays
//! clean, and a more verbose log file in the data directory.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::log_path;

/// Filter for the stderr sink, e.g. `KUBEWRAP_LOG=debug`
pub const LOG_ENV: &str = "KUBEWRAP_LOG";

/// Filter for the log file sink
pub const FILE_LOG_ENV: &str = "KUBEWRAP_FILE_LOG";

const DEFAULT_STDERR_FILTER: &str = "warn";
const DEFAULT_FILE_FILTER: &str = "info";

/// Daily log files kept next to the current one
pub const MAX_LOG_FILES: usize = 7;

/// Keeps the file writer alive. Dropping it flushes pending lines, so it
/// must be dropped before the process image is replaced.
#[must_use]
pub struct LogGuard(Option<WorkerGuard>);

impl LogGuard {
    pub fn flush(self) {
        drop(self);
    }
}

pub fn init() -> LogGuard {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(env_filter(LOG_ENV, DEFAULT_STDERR_FILTER));

    let (file_layer, guard) = match file_appender() {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(FILE_LOG_ENV, DEFAULT_FILE_FILTER));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    LogGuard(guard)
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn file_appender() -> Option<RollingFileAppender> {
    let path = log_path();
    let dir = path.parent()?;
    std::fs::create_dir_all(dir).ok()?;
    file_appender_in(dir, path.file_name()?.to_str()?)
}

/// Daily `<prefix>.<date>` files in `dir`, the oldest pruned past
/// [`MAX_LOG_FILES`].
fn file_appender_in(dir: &Path, prefix: &str) -> Option<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .ok()
}
