//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use crate::fixtures::{file_target, local_storage};
use cron_backup::config::{ComponentConfig, Config, GlobalConfig, JobConfig, RetryConfig, RetrySettings};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    retry: RetryConfig,
    jobs: BTreeMap<String, JobConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with minimal defaults and no jobs
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let work_dir = temp_dir.path().join("tmp");
        fs::create_dir_all(&work_dir).expect("Failed to create temp_dir");

        let global = GlobalConfig {
            app_name: "myapp".to_string(),
            schedule: "0 3 * * *".to_string(),
            temp_dir: Some(work_dir),
            log_directory,
            ..GlobalConfig::default()
        };

        Self {
            temp_dir,
            global,
            retry: RetryConfig::default(),
            jobs: BTreeMap::new(),
        }
    }

    /// Create a minimal config with one file job shipped to a local directory
    pub fn minimal() -> Self {
        Self::new().add_file_job("svc1", "payload")
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.global.app_name = app_name.to_string();
        self
    }

    /// Set the global schedule
    pub fn with_schedule(mut self, schedule: &str) -> Self {
        self.global.schedule = schedule.to_string();
        self
    }

    /// Set every retry layer to `attempts` without sleeping
    pub fn without_retry_sleep(mut self, attempts: u32) -> Self {
        let settings = RetrySettings {
            attempts: Some(attempts),
            sleep_seconds: Some(0),
        };
        self.retry = RetryConfig {
            job: settings.clone(),
            storage: settings.clone(),
            notifier: settings,
        };
        self
    }

    /// Add a job backing up a freshly written file into `backups/`
    pub fn add_file_job(self, name: &str, content: &str) -> Self {
        let source = self.temp_dir.path().join("data").join(format!("{}.txt", name));
        fs::create_dir_all(source.parent().expect("data dir")).expect("Failed to create data dir");
        fs::write(&source, content).expect("Failed to write source file");

        let backups = self.backup_dir();
        self.add_job(
            name,
            JobConfig {
                schedule: None,
                target: file_target(&source),
                storages: vec![local_storage(&backups)],
                notifiers: vec![],
            },
        )
    }

    /// Add a job with a custom target and storages
    pub fn add_job_with(
        self,
        name: &str,
        target: ComponentConfig,
        storages: Vec<ComponentConfig>,
    ) -> Self {
        self.add_job(
            name,
            JobConfig {
                schedule: None,
                target,
                storages,
                notifiers: vec![],
            },
        )
    }

    /// Add a job with full configuration
    pub fn add_job(mut self, name: &str, job: JobConfig) -> Self {
        self.jobs.insert(name.to_string(), job);
        self
    }

    /// Override the schedule of an existing job
    pub fn with_job_schedule(mut self, name: &str, schedule: &str) -> Self {
        if let Some(job) = self.jobs.get_mut(name) {
            job.schedule = Some(schedule.to_string());
        }
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory receiving local backups (created on demand)
    pub fn backup_dir(&self) -> PathBuf {
        let path = self.temp_dir.path().join("backups");
        fs::create_dir_all(&path).expect("Failed to create backup dir");
        path
    }

    /// Build the configuration (temp directory is dropped!)
    pub fn build(self) -> Config {
        Config {
            global: self.global,
            retry: self.retry,
            jobs: self.jobs,
        }
    }

    /// Build and keep the temp directory alive
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            retry: self.retry,
            jobs: self.jobs,
        };
        (config, self.temp_dir)
    }

    /// Build, write `config.toml` into the temp directory and return its path
    pub fn write(self) -> (PathBuf, Config, TempDir) {
        let (config, temp_dir) = self.persist();
        let path = temp_dir.path().join("config.toml");
        let contents = toml::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        (path, config, temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
