//! Job builder - turns resolved configuration into runnable backup jobs

use crate::config::{ComponentConfig, Config, ConfigError, ResolvedJob};
use crate::managers::backup::{BackupJob, RetryLayers};
use crate::notifiers::{
    Notifier, NotifierKind, SlackNotifier, SlackParams, TelegramNotifier, TelegramParams,
};
use crate::storages::{
    LocalParams, LocalStorage, RemoteParams, RemoteStorage, S3Params, S3Storage, Storage,
    StorageKind,
};
use crate::targets::{
    DirectoryParams, DirectoryTarget, FileParams, FileTarget, PostgresParams, PostgresTarget,
    Target, TargetKind,
};
use crate::utils::{CommandExecutor, RealExecutor};
use serde::de::DeserializeOwned;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, ConfigError>;

pub struct JobBuilder {
    app_name: String,
    temp_dir: PathBuf,
    retry: RetryLayers,
    executor: Arc<dyn CommandExecutor>,
}

impl JobBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            app_name: config.global.app_name.clone(),
            temp_dir: config.global.temp_dir.clone().unwrap_or_else(env::temp_dir),
            retry: config.retry.layers(),
            executor: Arc::new(RealExecutor),
        }
    }

    /// Run external tools through `executor` instead of spawning them directly
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_retry(mut self, retry: RetryLayers) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(&self, job: &ResolvedJob) -> Result<BackupJob> {
        debug!("Building job '{}'", job.name);

        let target = self.build_target(&job.config.target)?;
        let storages = job
            .config
            .storages
            .iter()
            .map(|c| self.build_storage(c))
            .collect::<Result<Vec<_>>>()?;
        let notifiers = job
            .config
            .notifiers
            .iter()
            .map(|c| self.build_notifier(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(BackupJob::new(
            &job.name,
            &self.app_name,
            job.namespace.as_deref(),
            target,
            storages,
            notifiers,
        )
        .with_temp_dir(&self.temp_dir)
        .with_retry(self.retry))
    }

    pub fn build_all(&self, jobs: &[ResolvedJob]) -> Result<Vec<BackupJob>> {
        jobs.iter().map(|job| self.build(job)).collect()
    }

    fn build_target(&self, component: &ComponentConfig) -> Result<Box<dyn Target>> {
        let target: Box<dyn Target> = match parse_kind::<TargetKind>("target", component)? {
            TargetKind::Postgresql => Box::new(PostgresTarget::new(
                decode_params::<PostgresParams>("target", component)?,
                self.executor.clone(),
            )),
            TargetKind::File => Box::new(FileTarget::new(decode_params::<FileParams>(
                "target", component,
            )?)),
            TargetKind::Directory => Box::new(DirectoryTarget::new(
                decode_params::<DirectoryParams>("target", component)?,
            )),
        };
        Ok(target)
    }

    fn build_storage(&self, component: &ComponentConfig) -> Result<Box<dyn Storage>> {
        let storage: Box<dyn Storage> = match parse_kind::<StorageKind>("storage", component)? {
            StorageKind::Aws => Box::new(S3Storage::new(decode_params::<S3Params>(
                "storage", component,
            )?)),
            StorageKind::Local => Box::new(LocalStorage::new(decode_params::<LocalParams>(
                "storage", component,
            )?)),
            StorageKind::Remote => Box::new(RemoteStorage::new(
                decode_params::<RemoteParams>("storage", component)?,
                self.executor.clone(),
            )),
        };
        Ok(storage)
    }

    fn build_notifier(&self, component: &ComponentConfig) -> Result<Box<dyn Notifier>> {
        let notifier: Box<dyn Notifier> = match parse_kind::<NotifierKind>("notifier", component)? {
            NotifierKind::Slack => {
                let params: SlackParams = decode_params("notifier", component)?;
                Box::new(SlackNotifier::new(params))
            }
            NotifierKind::Telegram => {
                let params: TelegramParams = decode_params("notifier", component)?;
                Box::new(TelegramNotifier::new(params))
            }
        };
        Ok(notifier)
    }

    /// External programs the job's collaborators invoke
    pub fn required_programs(&self, job: &ResolvedJob) -> Result<Vec<&'static str>> {
        let mut programs = Vec::new();

        if parse_kind::<TargetKind>("target", &job.config.target)? == TargetKind::Postgresql {
            programs.push("pg_dump");
        }

        for component in &job.config.storages {
            if parse_kind::<StorageKind>("storage", component)? == StorageKind::Remote {
                let params = decode_params::<RemoteParams>("storage", component)?;
                programs.extend(RemoteStorage::new(params, self.executor.clone()).required_programs());
            }
        }

        programs.sort_unstable();
        programs.dedup();
        Ok(programs)
    }

    /// Required programs the executor cannot find
    pub fn missing_programs(&self, job: &ResolvedJob) -> Result<Vec<&'static str>> {
        Ok(self
            .required_programs(job)?
            .into_iter()
            .filter(|program| !self.executor.is_available(program))
            .collect())
    }
}

fn parse_kind<K: FromStr>(kind: &'static str, component: &ComponentConfig) -> Result<K> {
    K::from_str(&component.kind).map_err(|_| ConfigError::UnknownType {
        kind,
        tag: component.kind.clone(),
    })
}

fn decode_params<T: DeserializeOwned>(kind: &'static str, component: &ComponentConfig) -> Result<T> {
    toml::Value::Table(component.params.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidParams {
            kind,
            tag: component.kind.clone(),
            message: e.message().to_string(),
        })
}
