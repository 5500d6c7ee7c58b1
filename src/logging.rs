//! Console and file logging.
//!
//! `LOG_LEVEL` sets the filter for both layers. HTTP server internals stay
//! quiet unless the level is DEBUG or TRACE.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

const SERVER_INTERNALS: [&str; 3] = ["hyper", "h2", "tower_http"];

/// Filter directive for a configured level name.
pub fn filter_directive(log_level: &str, verbose: bool) -> String {
    let level = log_level.to_lowercase();
    if verbose {
        return level;
    }

    let mut directive = level;
    for target in SERVER_INTERNALS {
        directive.push_str(&format!(",{}=warn", target));
    }
    directive
}

/// Install the global subscriber. The returned guard flushes the file
/// writer and must be held until shutdown.
pub fn init(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let directive = filter_directive(&config.log_level, config.is_verbose());
    let mut layers = Vec::new();

    layers.push(
        fmt::layer()
            .with_target(true)
            .with_filter(EnvFilter::try_new(&directive)?)
            .boxed(),
    );

    let guard = match &config.log_file {
        Some(log_file) => {
            let (directory, file_name) = split_log_path(log_file)?;
            std::fs::create_dir_all(directory)?;

            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            layers.push(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(non_blocking)
                    .with_filter(EnvFilter::try_new(&directive)?)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        level = %config.log_level,
        log_file = ?config.log_file,
        "Logging initialized"
    );

    Ok(guard)
}

fn split_log_path(path: &Path) -> anyhow::Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("LOG_FILE has no file name: {}", path.display()))?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((directory, file_name))
}
