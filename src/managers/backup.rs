//! Backup job - runs the artifact / upload / notify pipeline

use crate::error::JobError;
use crate::notifiers::Notifier;
use crate::storages::Storage;
use crate::targets::{Artifact, ArtifactNaming, Target, TargetKind};
use crate::utils::RetryPolicy;
use std::env;
use std::path::Path;
use tracing::{error, info, info_span};

/// Retry policies for the three layers of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLayers {
    /// Around a whole pipeline attempt
    pub job: RetryPolicy,
    /// Around each storage upload
    pub storage: RetryPolicy,
    /// Around each notification delivery
    pub notifier: RetryPolicy,
}

impl Default for RetryLayers {
    fn default() -> Self {
        Self {
            job: RetryPolicy::from_secs(2, 5),
            storage: RetryPolicy::from_secs(2, 5),
            notifier: RetryPolicy::from_secs(3, 3),
        }
    }
}

impl RetryLayers {
    /// Single attempt everywhere, no sleeping
    pub fn none() -> Self {
        Self {
            job: RetryPolicy::once(),
            storage: RetryPolicy::once(),
            notifier: RetryPolicy::once(),
        }
    }
}

pub fn success_message(kind: TargetKind, name: &str, app_name: &str, storage: &str) -> String {
    format!(
        "\u{1F49A} Created a {} backup `{}` for application `{}` in storage `{}`",
        kind, name, app_name, storage
    )
}

pub fn failure_message(app_name: &str, error: &JobError) -> String {
    format!("\u{1F494} Error: `{}` ```{}```", app_name, error)
}

/// One configured backup job
///
/// Built once from configuration and never mutated afterwards.
pub struct BackupJob {
    name: String,
    naming: ArtifactNaming,
    target: Box<dyn Target>,
    storages: Vec<Box<dyn Storage>>,
    notifiers: Vec<Box<dyn Notifier>>,
    retry: RetryLayers,
}

impl BackupJob {
    pub fn new(
        name: &str,
        app_name: &str,
        namespace: Option<&str>,
        target: Box<dyn Target>,
        storages: Vec<Box<dyn Storage>>,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            naming: ArtifactNaming::new(app_name, namespace, &env::temp_dir()),
            target,
            storages,
            notifiers,
            retry: RetryLayers::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryLayers) -> Self {
        self.retry = retry;
        self
    }

    /// Directory for temporary artifacts (defaults to the system temp dir)
    pub fn with_temp_dir(mut self, temp_dir: &Path) -> Self {
        self.naming.temp_dir = temp_dir.to_path_buf();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_name(&self) -> &str {
        &self.naming.app_name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.naming.namespace.as_deref()
    }

    pub fn naming(&self) -> &ArtifactNaming {
        &self.naming
    }

    pub fn retry(&self) -> &RetryLayers {
        &self.retry
    }

    pub fn target_kind(&self) -> TargetKind {
        self.target.kind()
    }

    pub fn storage_descriptions(&self) -> Vec<String> {
        self.storages.iter().map(|s| s.describe()).collect()
    }

    pub fn notifier_names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Run the pipeline under the job-level retry policy.
    ///
    /// A retry prepares a fresh artifact and resumes at the first storage
    /// that was not both uploaded and announced, so no storage is announced
    /// twice. Notifiers hear about a failure once, after the last attempt.
    pub fn run(&self) -> Result<(), JobError> {
        let span = info_span!("job", job = %self.name, pid = std::process::id());
        let _enter = span.enter();

        info!("Starting backup job for application '{}'", self.app_name());
        let label = format!("Backup job '{}'", self.name);
        let mut shipped = 0;

        match self.retry.job.run(&label, || self.attempt(&mut shipped)) {
            Ok(()) => {
                info!("Backup job '{}' completed", self.name);
                Ok(())
            }
            Err(e) => Err(self.report_failure(e)),
        }
    }

    /// A single pipeline attempt followed by failure reporting
    pub fn run_once(&self) -> Result<(), JobError> {
        let span = info_span!("job", job = %self.name, pid = std::process::id());
        let _enter = span.enter();

        self.run_attempt().map_err(|e| self.report_failure(e))
    }

    /// Produce the artifact and ship it to every storage in order.
    ///
    /// The first failing storage aborts the attempt. The artifact is dropped,
    /// and a temporary one deleted, on every return path.
    pub fn run_attempt(&self) -> Result<(), JobError> {
        self.attempt(&mut 0)
    }

    /// Ship to the storages after the first `shipped`, counting each one
    /// that is uploaded and announced
    fn attempt(&self, shipped: &mut usize) -> Result<(), JobError> {
        let artifact = self.target.prepare(&self.naming)?;
        info!("Prepared artifact '{}' at {:?}", artifact.name(), artifact.path());

        if *shipped > 0 {
            info!(
                "Resuming after {} storage(s) shipped by an earlier attempt",
                shipped
            );
        }

        for storage in self.storages.iter().skip(*shipped) {
            self.ship(&artifact, storage.as_ref())?;
            *shipped += 1;
        }

        Ok(())
    }

    fn ship(&self, artifact: &Artifact, storage: &dyn Storage) -> Result<(), JobError> {
        let description = storage.describe();

        self.retry.storage.run(&format!("Upload to {}", description), || {
            storage.upload(artifact.path(), artifact.name())
        })?;
        info!("Uploaded '{}' to {}", artifact.name(), description);

        let message = success_message(
            self.target.kind(),
            artifact.name(),
            self.app_name(),
            &description,
        );
        self.broadcast(&message)
    }

    /// Deliver `message` to every notifier, stopping at the first failure
    fn broadcast(&self, message: &str) -> Result<(), JobError> {
        for notifier in &self.notifiers {
            self.deliver(notifier.as_ref(), message)?;
        }
        Ok(())
    }

    fn deliver(&self, notifier: &dyn Notifier, message: &str) -> Result<(), JobError> {
        self.retry
            .notifier
            .run(&format!("Notification via {}", notifier.name()), || {
                notifier.notify(message)
            })
    }

    /// Tell every notifier about `cause` and return the error to surface
    fn report_failure(&self, cause: JobError) -> JobError {
        error!("Backup job '{}' failed: {}", self.name, cause);

        let message = failure_message(self.app_name(), &cause);
        let mut undelivered = None;

        for notifier in &self.notifiers {
            if let Err(e) = self.deliver(notifier.as_ref(), &message) {
                error!(
                    "Failed to deliver failure notification via {}: {}",
                    notifier.name(),
                    e
                );
                undelivered.get_or_insert(e);
            }
        }

        match undelivered {
            Some(notify) => JobError::Unreported {
                cause: Box::new(cause),
                notify: Box::new(notify),
            },
            None => cause,
        }
    }
}
