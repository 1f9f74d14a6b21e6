//! Log sink setup
//!
//! Logs go to `<log_dir>/monotui.log` through a non-blocking writer. The TUI
//! owns the terminal, so stderr is only used by the plain subcommands.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use monotui_core::config::LoggingConfig;

pub const LOG_FILE: &str = "monotui.log";
const LOG_ENV: &str = "MONOTUI_LOG";

/// `~` and `~/...` resolve against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn open_log_file(config: &LoggingConfig) -> io::Result<(PathBuf, fs::File)> {
    let dir = expand_home(&config.log_dir);
    fs::create_dir_all(&dir)?;
    let path = dir.join(LOG_FILE);

    let mut options = OpenOptions::new();
    options.create(true);
    if config.truncate_on_start {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    let file = options.open(&path)?;
    Ok((path, file))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig, allow_stderr: bool) -> Option<WorkerGuard> {
    if config.file {
        match open_log_file(config) {
            Ok((path, file)) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter(config))
                    .with_writer(writer)
                    .with_ansi(false)
                    .try_init();
                tracing::debug!(path = %path.display(), "logging to file");
                return Some(guard);
            }
            Err(e) => {
                eprintln!("Warning: cannot open log file in {}: {}", config.log_dir, e);
            }
        }
    }

    if allow_stderr {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter(config))
            .with_writer(io::stderr)
            .try_init();
    }
    None
}
