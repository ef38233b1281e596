//! Directory archive target
//!
//! Zips a directory into a temporary archive. Entries are rooted at the
//! directory's own name, so `/srv/uploads` unpacks into `uploads/`.

use super::{Artifact, ArtifactNaming, Target, TargetKind};
use crate::error::JobError;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DirectoryParams {
    /// Directory to archive
    #[serde(alias = "dirpath")]
    pub path: PathBuf,
}

pub struct DirectoryTarget {
    params: DirectoryParams,
}

impl DirectoryTarget {
    pub fn new(params: DirectoryParams) -> Self {
        Self { params }
    }
}

impl Target for DirectoryTarget {
    fn prepare(&self, naming: &ArtifactNaming) -> Result<Artifact, JobError> {
        let name = naming.timestamped("zip", Utc::now());
        let artifact = Artifact::temporary(naming.temp_path(&name), name);

        info!(
            "Archiving directory {:?} to {:?}",
            self.params.path,
            artifact.path()
        );

        write_archive(&self.params.path, artifact.path()).map_err(JobError::artifact)?;

        Ok(artifact)
    }

    fn kind(&self) -> TargetKind {
        TargetKind::Directory
    }
}

/// Write `source_dir` recursively into a zip file at `archive_path`
pub fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        anyhow::bail!("Directory does not exist: {:?}", source_dir);
    }

    let root = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("Directory path has no final component")?;

    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive: {:?}", archive_path))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_directory(&mut zip, source_dir, &root, options)?;

    zip.finish().context("Failed to finalize archive")?;
    Ok(())
}

fn add_directory<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.add_directory(format!("{}/", prefix), options)
        .with_context(|| format!("Failed to add directory entry: {}", prefix))?;

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let entry_name = format!("{}/{}", prefix, entry.file_name().to_string_lossy());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            add_directory(zip, &entry.path(), &entry_name, options)?;
        } else if file_type.is_file() {
            zip.start_file(entry_name.as_str(), options)
                .with_context(|| format!("Failed to add file entry: {}", entry_name))?;
            let mut source = File::open(entry.path())
                .with_context(|| format!("Failed to open {:?}", entry.path()))?;
            io::copy(&mut source, zip)?;
        }
        // Symlinks and special files are skipped
    }

    Ok(())
}
