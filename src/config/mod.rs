//! Configuration module for cron-backup
//!
//! This module handles loading, validating, and resolving configuration from TOML files.
//!
//! ## Jobs
//!
//! Every `[jobs.<name>]` table becomes one backup job whose name doubles as
//! the namespace mixed into artifact names. Without any `[jobs]`, a single
//! un-namespaced job named `default` is read from environment variables
//! (`BACKUP_POSTGRES_*`, `BACKUP_PATH`, `bot_token`, `chat_ids`).
//!
//! ## Example Usage
//!
//! ```no_run
//! use cron_backup::config;
//!
//! let config = config::load_config("/etc/cron-backup/config.toml")?;
//!
//! for job in config::resolve_jobs(&config)? {
//!     println!("Job: {}, schedule: {}", job.name, job.schedule);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, find_job, legacy_job_from_env, load_config, load_config_from_str,
    load_config_or_env, resolve_jobs, resolve_jobs_with, ConfigError, Result, ENV_PREFIX,
    LEGACY_JOB_NAME,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
