//! Test utilities for cron-backup
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing the cron-backup application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockNotifier, MockStorage, MockTarget, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let storage = MockStorage::new("a");
//!     let job = ctx.job(MockTarget::temporary("dump"), &[storage.clone()], &[]);
//!     job.run().unwrap();
//!     assert_eq!(storage.upload_count(), 1);
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{assert_notified, TestContext};

// Re-export types from the main crate for convenience
pub use cron_backup::config::{
    ComponentConfig, Config, ConfigError, GlobalConfig, JobConfig, ResolvedJob, RetryConfig,
    RetrySettings,
};
pub use cron_backup::managers::backup::{BackupJob, RetryLayers};
pub use cron_backup::utils::RetryPolicy;
pub use cron_backup::JobError;

// Re-export mock implementations from the main crate
pub use cron_backup::notifiers::mock::MockNotifier;
pub use cron_backup::notifiers::Notifier;
pub use cron_backup::storages::mock::{MockStorage, UploadCall};
pub use cron_backup::storages::Storage;
pub use cron_backup::targets::mock::MockTarget;
pub use cron_backup::targets::Target;
pub use cron_backup::utils::dispatch::mock::MockDispatcher;
pub use cron_backup::utils::executor::mock::{MockExecutor, MockResponse};
pub use cron_backup::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
