//! PostgreSQL dump target
//!
//! Runs `pg_dump` into a temporary plain-SQL file.

use super::{Artifact, ArtifactNaming, Target, TargetKind};
use crate::error::JobError;
use crate::utils::CommandExecutor;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PostgresParams {
    pub postgres_host: String,
    #[serde(default = "default_port")]
    pub postgres_port: u16,
    pub postgres_db: String,
    pub postgres_user: String,
    #[serde(default)]
    pub postgres_password: String,
}

fn default_port() -> u16 {
    5432
}

pub struct PostgresTarget {
    params: PostgresParams,
    executor: Arc<dyn CommandExecutor>,
}

impl PostgresTarget {
    pub fn new(params: PostgresParams, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { params, executor }
    }

    /// `pg_dump` arguments writing a plain dump without ownership or grants
    fn dump_args(&self, output: &str) -> Vec<String> {
        vec![
            "--no-owner".to_string(),
            "--no-privileges".to_string(),
            "-h".to_string(),
            self.params.postgres_host.clone(),
            "-p".to_string(),
            self.params.postgres_port.to_string(),
            "-U".to_string(),
            self.params.postgres_user.clone(),
            self.params.postgres_db.clone(),
            "-f".to_string(),
            output.to_string(),
            "-F".to_string(),
            "plain".to_string(),
        ]
    }
}

impl Target for PostgresTarget {
    fn prepare(&self, naming: &ArtifactNaming) -> Result<Artifact, JobError> {
        let name = naming.timestamped("sql", Utc::now());
        let artifact = Artifact::temporary(naming.temp_path(&name), name);

        let output = artifact.path().display().to_string();
        info!("Dumping database '{}' to {}", self.params.postgres_db, output);

        let args = self.dump_args(&output);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        self.executor
            .run_command(
                "pg_dump",
                &args,
                &[("PGPASSWORD", self.params.postgres_password.as_str())],
            )
            .map_err(|e| JobError::artifact(e.context("pg_dump failed")))?;

        Ok(artifact)
    }

    fn kind(&self) -> TargetKind {
        TargetKind::Postgresql
    }
}
