//! Local filesystem storage

use super::Storage;
use crate::error::JobError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LocalParams {
    /// Directory receiving the backups
    pub backup_path: PathBuf,
}

pub struct LocalStorage {
    params: LocalParams,
}

impl LocalStorage {
    pub fn new(params: LocalParams) -> Self {
        Self { params }
    }
}

impl Storage for LocalStorage {
    fn upload(&self, source: &Path, name: &str) -> Result<(), JobError> {
        let destination = self.params.backup_path.join(name);
        info!("Copying {:?} to {:?}", source, destination);

        fs::copy(source, &destination)
            .with_context(|| format!("Failed to copy {:?} to {:?}", source, destination))
            .map_err(|e| JobError::upload(&self.describe(), e))?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!("(Local directory path: {})", self.params.backup_path.display())
    }
}
