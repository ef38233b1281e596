use super::expand_tilde;
use super::types::*;
use crate::notifiers::NotifierKind;
use crate::storages::StorageKind;
use crate::targets::TargetKind;
use crate::utils::cron::validate_cron_schedule;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix of every environment variable read by the loader
pub const ENV_PREFIX: &str = "BACKUP_";

/// Name of the job built from environment variables
pub const LEGACY_JOB_NAME: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown {kind} type '{tag}'")]
    UnknownType { kind: &'static str, tag: String },

    #[error("Invalid parameters for {kind} '{tag}': {message}")]
    InvalidParams {
        kind: &'static str,
        tag: String,
        message: String,
    },

    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Job '{0}' not found")]
    JobNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load configuration from the `BACKUP_CONFIG` variable when
/// `BACKUP_USE_CONFIG=on`, otherwise from `path`
pub fn load_config_or_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let use_inline = env::var(format!("{}USE_CONFIG", ENV_PREFIX)).ok();
    if use_inline.as_deref() == Some("on") {
        let name = format!("{}CONFIG", ENV_PREFIX);
        let contents = env::var(&name).map_err(|_| ConfigError::MissingVariable(name))?;
        return load_config_from_str(&contents);
    }
    load_config(path)
}

/// Parse, apply environment overrides and validate
pub fn load_config_from_str(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents)?;
    apply_env_overrides(&mut config, |name| env::var(name).ok());

    config.global.log_directory = expand_tilde(&config.global.log_directory);
    config.global.temp_dir = config.global.temp_dir.as_deref().map(expand_tilde);

    validate_config(&config)?;
    Ok(config)
}

/// `BACKUP_APP_NAME` and `BACKUP_CRON_EXPRESSION` override the `[global]` values
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(app_name) = lookup(&format!("{}APP_NAME", ENV_PREFIX)) {
        config.global.app_name = app_name;
    }
    if let Some(schedule) = lookup(&format!("{}CRON_EXPRESSION", ENV_PREFIX)) {
        config.global.schedule = schedule;
    }
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.global.app_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "global.app_name is empty (set it in [global] or BACKUP_APP_NAME)".to_string(),
        ));
    }

    if config.global.poll_interval_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "global.poll_interval_seconds must be at least 1".to_string(),
        ));
    }

    if !config.global.schedule.is_empty() && !validate_cron_schedule(&config.global.schedule) {
        return Err(ConfigError::ValidationError(format!(
            "Invalid global cron schedule: {}",
            config.global.schedule
        )));
    }

    // The environment job runs on the global schedule
    if config.jobs.is_empty() && config.global.schedule.is_empty() {
        return Err(ConfigError::ValidationError(
            "No jobs defined and no global schedule (set BACKUP_CRON_EXPRESSION)".to_string(),
        ));
    }

    for (name, job) in &config.jobs {
        validate_job(name, job, config)?;
    }

    Ok(())
}

fn validate_job(name: &str, job: &JobConfig, config: &Config) -> Result<()> {
    let schedule = effective_schedule(job, config);
    if schedule.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Job '{}' has no schedule and there is no global schedule",
            name
        )));
    }
    if !validate_cron_schedule(schedule) {
        return Err(ConfigError::ValidationError(format!(
            "Job '{}': invalid cron schedule: {}",
            name, schedule
        )));
    }

    check_tag::<TargetKind>("target", &job.target)?;
    for storage in &job.storages {
        check_tag::<StorageKind>("storage", storage)?;
    }
    for notifier in &job.notifiers {
        check_tag::<NotifierKind>("notifier", notifier)?;
    }

    Ok(())
}

fn check_tag<K: FromStr>(kind: &'static str, component: &ComponentConfig) -> Result<()> {
    K::from_str(&component.kind)
        .map(|_| ())
        .map_err(|_| ConfigError::UnknownType {
            kind,
            tag: component.kind.clone(),
        })
}

fn effective_schedule<'a>(job: &'a JobConfig, config: &'a Config) -> &'a str {
    job.schedule
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&config.global.schedule)
}

/// Resolve every job, reading the environment job when `[jobs]` is empty
pub fn resolve_jobs(config: &Config) -> Result<Vec<ResolvedJob>> {
    resolve_jobs_with(config, |name| env::var(name).ok())
}

pub fn resolve_jobs_with<F>(config: &Config, lookup: F) -> Result<Vec<ResolvedJob>>
where
    F: Fn(&str) -> Option<String>,
{
    if config.jobs.is_empty() {
        return Ok(vec![ResolvedJob {
            name: LEGACY_JOB_NAME.to_string(),
            namespace: None,
            schedule: config.global.schedule.clone(),
            config: legacy_job_from_env(lookup)?,
        }]);
    }

    Ok(config
        .jobs
        .iter()
        .map(|(name, job)| ResolvedJob {
            name: name.clone(),
            namespace: Some(name.clone()),
            schedule: effective_schedule(job, config).to_string(),
            config: job.clone(),
        })
        .collect())
}

/// Resolve a single job by name
pub fn find_job(config: &Config, name: &str) -> Result<ResolvedJob> {
    resolve_jobs(config)?
        .into_iter()
        .find(|job| job.name == name)
        .ok_or_else(|| ConfigError::JobNotFound(name.to_string()))
}

/// Flat single-job configuration from environment variables: a PostgreSQL
/// dump shipped to `BACKUP_PATH`, optionally announced on Telegram
pub fn legacy_job_from_env<F>(lookup: F) -> Result<JobConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |suffix: &str| {
        let name = format!("{}{}", ENV_PREFIX, suffix);
        lookup(&name)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingVariable(name))
    };

    let mut target = toml::Table::new();
    target.insert("postgres_host".into(), required("POSTGRES_HOST")?.into());
    target.insert("postgres_db".into(), required("POSTGRES_DB")?.into());
    target.insert("postgres_user".into(), required("POSTGRES_USER")?.into());

    if let Some(port) = lookup(&format!("{}POSTGRES_PORT", ENV_PREFIX)) {
        let port: i64 = port.parse().map_err(|_| ConfigError::InvalidParams {
            kind: "target",
            tag: TargetKind::Postgresql.to_string(),
            message: format!("BACKUP_POSTGRES_PORT is not a port number: {}", port),
        })?;
        target.insert("postgres_port".into(), port.into());
    }
    if let Some(password) = lookup(&format!("{}POSTGRES_PASSWORD", ENV_PREFIX)) {
        target.insert("postgres_password".into(), password.into());
    }

    let mut storage = toml::Table::new();
    storage.insert("backup_path".into(), required("PATH")?.into());

    let mut notifiers = Vec::new();
    if let Some(bot_token) = lookup("bot_token").filter(|t| !t.is_empty()) {
        let chat_ids: Vec<toml::Value> = lookup("chat_ids")
            .ok_or_else(|| ConfigError::MissingVariable("chat_ids".to_string()))?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(toml::Value::from)
            .collect();

        let mut params = toml::Table::new();
        params.insert("bot_token".into(), bot_token.into());
        params.insert("chat_ids".into(), toml::Value::Array(chat_ids));
        notifiers.push(ComponentConfig::new(NotifierKind::Telegram.as_str(), params));
    }

    Ok(JobConfig {
        schedule: None,
        target: ComponentConfig::new(TargetKind::Postgresql.as_str(), target),
        storages: vec![ComponentConfig::new(StorageKind::Local.as_str(), storage)],
        notifiers,
    })
}
