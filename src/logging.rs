//! Tracing bootstrap.
//!
//! The terminal is owned by the UI, so events go to a log file instead of
//! stdout. Initialization happens at most once per process.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceLock<()> = OnceLock::new();

pub fn init_logging(log_file: &Path, filter: &str) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory `{}`", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file `{}`", log_file.display()))?;

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber installed elsewhere (tests) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();

    let _ = INSTALLED.set(());
    tracing::info!(log_file = %log_file.display(), "logging initialized");
    Ok(())
}
