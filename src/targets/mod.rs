//! Backup targets: what gets backed up
//!
//! A target materializes one [`Artifact`] per job run. Temporary artifacts
//! (dumps, archives) are deleted when the artifact is dropped, so every exit
//! path of a run cleans up after itself.

pub mod directory;
pub mod file;
pub mod postgres;

use crate::error::JobError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub use directory::{DirectoryParams, DirectoryTarget};
pub use file::{FileParams, FileTarget};
pub use postgres::{PostgresParams, PostgresTarget};

/// Timestamp embedded in generated artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Trait for backup targets
pub trait Target: Send + Sync {
    /// Produce the artifact for this run
    fn prepare(&self, naming: &ArtifactNaming) -> Result<Artifact, JobError>;

    /// Variant of this target, named in success notifications
    fn kind(&self) -> TargetKind;
}

/// Recognized target type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Postgresql,
    File,
    Directory,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "postgresql" => Ok(Self::Postgresql),
            "file" => Ok(Self::File),
            "directory" => Ok(Self::Directory),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for generating artifact and upload names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    pub app_name: String,
    pub namespace: Option<String>,
    pub temp_dir: PathBuf,
}

impl ArtifactNaming {
    pub fn new(app_name: &str, namespace: Option<&str>, temp_dir: &Path) -> Self {
        Self {
            app_name: app_name.to_string(),
            namespace: namespace.map(String::from),
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// `<app>` or `<app>_<namespace>`
    pub fn prefix(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}_{}", self.app_name, namespace),
            None => self.app_name.clone(),
        }
    }

    /// `<prefix>_<timestamp>.<extension>`
    pub fn timestamped(&self, extension: &str, at: DateTime<Utc>) -> String {
        format!("{}_{}.{}", self.prefix(), at.format(TIMESTAMP_FORMAT), extension)
    }

    /// Location of a temporary artifact with the given name
    pub fn temp_path(&self, name: &str) -> PathBuf {
        self.temp_dir.join(name)
    }
}

/// A local file to upload under a logical name
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    name: String,
    temporary: bool,
}

impl Artifact {
    /// An artifact owned by this run, removed on drop
    pub fn temporary(path: PathBuf, name: String) -> Self {
        Self {
            path,
            name,
            temporary: true,
        }
    }

    /// An existing file that must be left in place
    pub fn borrowed(path: PathBuf, name: String) -> Self {
        Self {
            path,
            name,
            temporary: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical upload name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if !self.temporary || !self.path.exists() {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary artifact: {:?}", self.path),
            Err(e) => warn!("Failed to remove temporary artifact {:?}: {}", self.path, e),
        }
    }
}

/// Scripted target for testing the pipeline
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    enum Behavior {
        /// Write a temporary file into the naming temp dir
        Temporary { content: String },
        /// Hand out an existing file
        Borrowed { path: PathBuf },
        /// Fail with the given message
        Failing { message: String },
    }

    /// Mock target recording every artifact it produced
    #[derive(Clone)]
    pub struct MockTarget {
        kind: TargetKind,
        behavior: Behavior,
        /// Paths handed out, one per `prepare` call
        pub prepared: Arc<Mutex<Vec<PathBuf>>>,
        /// Number of `prepare` calls, including failed ones
        pub calls: Arc<Mutex<usize>>,
    }

    impl MockTarget {
        fn with_behavior(kind: TargetKind, behavior: Behavior) -> Self {
            Self {
                kind,
                behavior,
                prepared: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        /// Produces a temporary `.bin` artifact with the given content
        pub fn temporary(content: &str) -> Self {
            Self::with_behavior(
                TargetKind::Directory,
                Behavior::Temporary {
                    content: content.to_string(),
                },
            )
        }

        /// Hands out an existing file without taking ownership
        pub fn borrowed(path: &Path) -> Self {
            Self::with_behavior(
                TargetKind::File,
                Behavior::Borrowed {
                    path: path.to_path_buf(),
                },
            )
        }

        /// Always fails to create an artifact
        pub fn failing(message: &str) -> Self {
            Self::with_behavior(
                TargetKind::Postgresql,
                Behavior::Failing {
                    message: message.to_string(),
                },
            )
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        pub fn prepared_paths(&self) -> Vec<PathBuf> {
            self.prepared.lock().unwrap().clone()
        }
    }

    impl Target for MockTarget {
        fn prepare(&self, naming: &ArtifactNaming) -> Result<Artifact, JobError> {
            *self.calls.lock().unwrap() += 1;

            let artifact = match &self.behavior {
                Behavior::Temporary { content } => {
                    let name = format!("{}_{}.bin", naming.prefix(), self.call_count());
                    let path = naming.temp_path(&name);
                    std::fs::write(&path, content)
                        .map_err(|e| JobError::ArtifactCreation(e.to_string()))?;
                    Artifact::temporary(path, name)
                }
                Behavior::Borrowed { path } => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    Artifact::borrowed(path.clone(), format!("{}_{}", naming.prefix(), file_name))
                }
                Behavior::Failing { message } => {
                    return Err(JobError::ArtifactCreation(message.clone()));
                }
            };

            self.prepared.lock().unwrap().push(artifact.path().to_path_buf());
            Ok(artifact)
        }

        fn kind(&self) -> TargetKind {
            self.kind
        }
    }
}
