//! Single file target

use super::{Artifact, ArtifactNaming, Target, TargetKind};
use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileParams {
    /// File to upload as-is
    #[serde(alias = "filepath")]
    pub path: PathBuf,
}

pub struct FileTarget {
    params: FileParams,
}

impl FileTarget {
    pub fn new(params: FileParams) -> Self {
        Self { params }
    }

    /// `<prefix>_<basename>`
    pub fn output_name(&self, naming: &ArtifactNaming) -> String {
        let file_name = self
            .params
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{}_{}", naming.prefix(), file_name)
    }
}

impl Target for FileTarget {
    fn prepare(&self, naming: &ArtifactNaming) -> Result<Artifact, JobError> {
        if !self.params.path.is_file() {
            return Err(JobError::ArtifactCreation(format!(
                "File does not exist: {:?}",
                self.params.path
            )));
        }

        let name = self.output_name(naming);
        info!("Backing up file {:?} as '{}'", self.params.path, name);

        Ok(Artifact::borrowed(self.params.path.clone(), name))
    }

    fn kind(&self) -> TargetKind {
        TargetKind::File
    }
}
