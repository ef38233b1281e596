//! Scratch space for pipeline tests
//!
//! A [`TestContext`] owns a temporary directory holding source data and an
//! `artifacts/` directory that jobs built with [`TestContext::job`] write their
//! temporary artifacts into, so tests can check nothing is left behind.

use cron_backup::managers::backup::{BackupJob, RetryLayers};
use cron_backup::notifiers::mock::MockNotifier;
use cron_backup::notifiers::Notifier;
use cron_backup::storages::mock::MockStorage;
use cron_backup::storages::Storage;
use cron_backup::targets::Target;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ARTIFACT_DIR: &str = "artifacts";

pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(temp_dir.path().join(ARTIFACT_DIR))
            .expect("Failed to create artifact dir");
        Self { temp_dir }
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Write `content` to `name`, creating parent directories
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.temp_dir.path().join(ARTIFACT_DIR)
    }

    /// Files a job left in the artifact directory
    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        fs::read_dir(self.artifact_dir())
            .expect("Failed to read artifact dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect()
    }

    /// A `myapp` job namespaced `svc1`, without retries, over the given mocks
    pub fn job<T: Target + 'static>(
        &self,
        target: T,
        storages: &[MockStorage],
        notifiers: &[MockNotifier],
    ) -> BackupJob {
        let storages = storages
            .iter()
            .map(|s| Box::new(s.clone()) as Box<dyn Storage>)
            .collect();
        let notifiers = notifiers
            .iter()
            .map(|n| Box::new(n.clone()) as Box<dyn Notifier>)
            .collect();

        BackupJob::new("svc1", "myapp", Some("svc1"), Box::new(target), storages, notifiers)
            .with_temp_dir(&self.artifact_dir())
            .with_retry(RetryLayers::none())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Panic unless every notifier got exactly `successes` success and
/// `failures` failure notifications
pub fn assert_notified(notifiers: &[MockNotifier], successes: usize, failures: usize) {
    for notifier in notifiers {
        assert_eq!(
            notifier.successes().len(),
            successes,
            "success notifications via {:?}: {:?}",
            Notifier::name(notifier),
            notifier.messages()
        );
        assert_eq!(
            notifier.failures().len(),
            failures,
            "failure notifications via {:?}: {:?}",
            Notifier::name(notifier),
            notifier.messages()
        );
    }
}
