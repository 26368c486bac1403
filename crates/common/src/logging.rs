//! Logging and tracing initialization.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// When `config.dir` is set, events are also appended to a daily file
/// `versereel_YYYYMMDD.log` inside that directory.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .with(file_layer(config.dir.as_deref()))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(file_layer(config.dir.as_deref()))
            .try_init()
            .ok();
    }
}

fn file_layer<S>(dir: Option<&Path>) -> Option<impl tracing_subscriber::Layer<S>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    dir.and_then(open_daily_log).map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file))
    })
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

/// Path of today's log file inside `dir`.
pub fn daily_log_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d");
    dir.join(format!("versereel_{stamp}.log"))
}

fn open_daily_log(dir: &Path) -> Option<File> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create log directory {}: {e}", dir.display());
        return None;
    }
    let path = daily_log_path(dir);
    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", path.display());
            None
        }
    }
}
