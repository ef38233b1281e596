//! Errors raised while running a backup job

use thiserror::Error;

/// Failure of one backup job run.
///
/// Collaborator errors (`anyhow` chains from commands, HTTP clients and the
/// filesystem) are flattened into the message at the collaborator boundary so
/// the value can be compared, cloned and passed unchanged through retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The dump or archive step failed
    #[error("Artifact creation failed: {0}")]
    ArtifactCreation(String),

    #[error("Upload to {storage} failed: {message}")]
    Upload { storage: String, message: String },

    #[error("Notification via {notifier} failed: {message}")]
    Notify { notifier: String, message: String },

    /// The job failed and the failure notification could not be delivered either
    #[error("{cause} (failure notification also failed: {notify})")]
    Unreported {
        cause: Box<JobError>,
        notify: Box<JobError>,
    },
}

impl JobError {
    pub fn artifact(err: anyhow::Error) -> Self {
        Self::ArtifactCreation(format!("{:#}", err))
    }

    pub fn upload(storage: &str, err: anyhow::Error) -> Self {
        Self::Upload {
            storage: storage.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn notify(notifier: &str, err: anyhow::Error) -> Self {
        Self::Notify {
            notifier: notifier.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// The error that made the job fail, skipping notification failures
    pub fn root_cause(&self) -> &JobError {
        match self {
            Self::Unreported { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
