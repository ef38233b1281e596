//! Logging setup
//!
//! The daemon and every execution unit it spawns log to stderr at INFO and to
//! a shared, daily-rotated file at the configured level. Lines of concurrent
//! units are told apart by the `job`/`pid` span opened by the backup pipeline.

use crate::config::{expand_tilde, GlobalConfig};
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Rotated files are named `cron-backup.<date>.log`
const LOG_FILE_PREFIX: &str = "cron-backup";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level of the file output; the console stays at INFO
    pub log_level: Level,
    /// Rotated files kept on disk
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("logs"),
            log_level: Level::INFO,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    /// Take directory, level and retention from `[global]`.
    ///
    /// Unknown level names fall back to INFO.
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            log_directory: expand_tilde(&global.log_directory),
            log_level: parse_level(&global.log_level).unwrap_or(Level::INFO),
            max_files: global.log_max_files.max(1) as usize,
        }
    }
}

fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => Level::from_str(other).ok(),
    }
}

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Daily-rotated appender pruning all but the newest `max_files` files
fn file_appender(log_dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {:?}", log_dir))
}

/// Filter for one output. `RUST_LOG` wins when set.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("cron_backup={}", level))
            .add_directive(LevelFilter::from_level(level).into())
    })
}

fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(level_filter(Level::INFO))
}

/// Console plus rotating file logging for the daemon and `run`
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let appender = file_appender(&config.log_directory, config.max_files)?;
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(level_filter(config.log_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer())
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Console-only logging for short-lived commands (`validate`, `list`)
pub fn init_console_logging() {
    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::registry().with(console_layer()).try_init();
}
