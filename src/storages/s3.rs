//! S3 object storage

use super::Storage;
use crate::error::JobError;
use anyhow::{Context, Result};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct S3Params {
    pub aws_bucket_name: String,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    #[serde(default)]
    pub aws_endpoint: Option<String>,
}

pub struct S3Storage {
    params: S3Params,
}

impl S3Storage {
    pub fn new(params: S3Params) -> Self {
        Self { params }
    }

    fn client(&self) -> Result<AmazonS3> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&self.params.aws_bucket_name)
            .with_region(&self.params.aws_region)
            .with_access_key_id(&self.params.aws_access_key_id)
            .with_secret_access_key(&self.params.aws_secret_access_key);

        if let Some(endpoint) = &self.params.aws_endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        builder.build().context("Failed to build S3 client")
    }

    fn put(&self, source: &Path, name: &str) -> Result<()> {
        let content =
            fs::read(source).with_context(|| format!("Failed to read artifact {:?}", source))?;
        let store = self.client()?;
        let location = ObjectPath::from(name);

        // The pipeline is synchronous; drive the async client on a private runtime
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create async runtime")?;

        runtime
            .block_on(store.put(&location, content.into()))
            .with_context(|| {
                format!(
                    "Failed to put object '{}' into bucket '{}'",
                    name, self.params.aws_bucket_name
                )
            })?;

        Ok(())
    }
}

impl Storage for S3Storage {
    fn upload(&self, source: &Path, name: &str) -> Result<(), JobError> {
        info!(
            "Uploading {:?} to s3://{}/{}",
            source, self.params.aws_bucket_name, name
        );
        self.put(source, name)
            .map_err(|e| JobError::upload(&self.describe(), e))
    }

    fn describe(&self) -> String {
        format!(
            "(AWS region: {}, S3 Bucket: {})",
            self.params.aws_region, self.params.aws_bucket_name
        )
    }
}
