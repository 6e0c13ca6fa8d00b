//! Log subscriber setup for binaries.
//!
//! The library itself only emits `tracing` events; call [`init`] once from
//! `main` to see them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Filter directive used when `RUST_LOG` is unset.
fn directive(config: &LogConfig, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        config.filter.as_str()
    }
}

fn env_filter(config: &LogConfig, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = directive(config, verbose);
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter '{directive}'"))
}

/// Installs the global subscriber.
///
/// Writes to `config.file` when set (keep the returned guard alive until exit
/// so buffered lines are flushed), stderr otherwise.
pub fn init(config: &LogConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config, verbose)?;

    let Some(file) = config.file.as_deref() else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
        return Ok(None);
    };

    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {file}"))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;

    Ok(Some(guard))
}
