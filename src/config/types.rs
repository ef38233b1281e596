use crate::managers::backup::RetryLayers;
use crate::utils::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Namespaced jobs; when empty a single job is read from the environment
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Application name mixed into every artifact name and notification
    #[serde(default)]
    pub app_name: String,

    /// Default cron expression for jobs without their own
    #[serde(default)]
    pub schedule: String,

    /// Directory for temporary artifacts (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            schedule: String::new(),
            temp_dir: None,
            poll_interval_seconds: default_poll_interval(),
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Retry overrides per layer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub job: RetrySettings,
    #[serde(default)]
    pub storage: RetrySettings,
    #[serde(default)]
    pub notifier: RetrySettings,
}

impl RetryConfig {
    /// Effective policies, unset values falling back to the built-in defaults
    pub fn layers(&self) -> RetryLayers {
        let defaults = RetryLayers::default();
        RetryLayers {
            job: self.job.policy(defaults.job),
            storage: self.storage.policy(defaults.storage),
            notifier: self.notifier.policy(defaults.notifier),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub sleep_seconds: Option<u64>,
}

impl RetrySettings {
    pub fn policy(&self, default: RetryPolicy) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts.unwrap_or(default.attempts()),
            self.sleep_seconds
                .map(std::time::Duration::from_secs)
                .unwrap_or(default.sleep()),
        )
    }
}

/// One backup job: a target, where to ship it and whom to tell
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct JobConfig {
    /// Cron expression overriding `global.schedule`
    #[serde(default)]
    pub schedule: Option<String>,

    pub target: ComponentConfig,

    #[serde(default)]
    pub storages: Vec<ComponentConfig>,

    #[serde(default)]
    pub notifiers: Vec<ComponentConfig>,
}

/// A typed collaborator: `{ type = "...", params = { ... } }`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ComponentConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub params: toml::Table,
}

impl ComponentConfig {
    pub fn new(kind: &str, params: toml::Table) -> Self {
        Self {
            kind: kind.to_string(),
            params,
        }
    }
}

/// A job ready to be built and scheduled
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJob {
    /// Key under `[jobs]`, or `default` for the environment job
    pub name: String,
    pub namespace: Option<String>,
    /// Effective cron expression
    pub schedule: String,
    pub config: JobConfig,
}

// Default value functions
fn default_poll_interval() -> u64 {
    1
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("~/logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_files() -> u32 {
    10
}
