//! Storage destinations: where artifacts are shipped
//!
//! Uploads must be safe to repeat with the same inputs, since both the
//! per-call and the job-level retry layers may call them again.

pub mod local;
pub mod remote;
pub mod s3;

use crate::error::JobError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use local::{LocalParams, LocalStorage};
pub use remote::{RemoteParams, RemoteStorage};
pub use s3::{S3Params, S3Storage};

/// Trait for storage destinations
pub trait Storage: Send + Sync {
    /// Upload the file at `source` under the logical name `name`
    fn upload(&self, source: &Path, name: &str) -> Result<(), JobError>;

    /// Human-readable description for notifications
    fn describe(&self) -> String;
}

/// Recognized storage type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Aws,
    Local,
    Remote,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "aws" => Ok(Self::Aws),
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recording storage for testing the pipeline
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recorded upload attempt
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct UploadCall {
        pub source: PathBuf,
        pub name: String,
        /// Whether the source file existed when the upload was attempted
        pub source_existed: bool,
    }

    /// Mock storage recording every upload attempt
    #[derive(Clone)]
    pub struct MockStorage {
        label: String,
        pub calls: Arc<Mutex<Vec<UploadCall>>>,
        /// Remaining attempts that fail; `None` fails forever
        failures_left: Arc<Mutex<Option<usize>>>,
        failing: bool,
        message: String,
    }

    impl MockStorage {
        /// A storage whose uploads always succeed
        pub fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
                calls: Arc::new(Mutex::new(Vec::new())),
                failures_left: Arc::new(Mutex::new(None)),
                failing: false,
                message: String::new(),
            }
        }

        /// Every upload fails with `message`
        pub fn failing(label: &str, message: &str) -> Self {
            Self {
                failing: true,
                message: message.to_string(),
                ..Self::new(label)
            }
        }

        /// The first `times` uploads fail with `message`, later ones succeed
        pub fn flaky(label: &str, times: usize, message: &str) -> Self {
            let storage = Self::failing(label, message);
            *storage.failures_left.lock().unwrap() = Some(times);
            storage
        }

        pub fn uploads(&self) -> Vec<UploadCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn upload_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn should_fail(&self) -> bool {
            if !self.failing {
                return false;
            }
            let mut left = self.failures_left.lock().unwrap();
            match left.as_mut() {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            }
        }
    }

    impl Storage for MockStorage {
        fn upload(&self, source: &Path, name: &str) -> Result<(), JobError> {
            self.calls.lock().unwrap().push(UploadCall {
                source: source.to_path_buf(),
                name: name.to_string(),
                source_existed: source.exists(),
            });

            if self.should_fail() {
                return Err(JobError::upload(
                    &self.describe(),
                    anyhow::anyhow!("{}", self.message),
                ));
            }
            Ok(())
        }

        fn describe(&self) -> String {
            format!("(Mock storage: {})", self.label)
        }
    }
}
