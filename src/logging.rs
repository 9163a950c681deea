//! Tracing setup
//!
//! The terminal UI owns stdout and stderr, so it logs to a file in the
//! cache directory. Subcommands log to stderr.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::APP_NAME;

const LOG_FILE: &str = "git-tm.log";
const FILTER_ENV: &str = "GIT_TM_LOG";

/// `GIT_TM_LOG`, then `RUST_LOG`, then `default`
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to `<cache dir>/git-tm.log`, returning the file path
pub fn init_file() -> Result<Option<PathBuf>> {
    let Some(dirs) = ProjectDirs::from("", "", APP_NAME) else {
        return Ok(None);
    };
    let dir = dirs.cache_dir();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    tracing_subscriber::registry()
        .with(env_filter("git_tm=info"))
        .with(fmt::layer().with_ansi(false).with_writer(appender))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(Some(dir.join(LOG_FILE)))
}

/// Log warnings and errors to stderr
pub fn init_stderr() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter("git_tm=warn"))
        .with(fmt::layer().with_writer(io::stderr))
        .try_init()
        .context("Failed to install log subscriber")
}
