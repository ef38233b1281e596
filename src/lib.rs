//! Cron Backup Library
//!
//! This library provides scheduled backups of PostgreSQL databases, files and
//! directories to object storage, local directories and SSH hosts, with
//! Slack and Telegram notifications.

pub mod config;
pub mod error;
pub mod managers;
pub mod notifiers;
pub mod storages;
pub mod targets;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_jobs, Config, ConfigError, ResolvedJob};
pub use error::JobError;
pub use managers::backup::{BackupJob, RetryLayers};
pub use managers::builder::JobBuilder;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::scheduler::{CronScheduler, Trigger};
