//! Remote host storage over SSH
//!
//! Uses `scp` (which speaks SFTP on current OpenSSH releases). Password
//! authentication goes through `sshpass -e` so the password never appears on
//! the command line.

use super::Storage;
use crate::error::JobError;
use crate::utils::CommandExecutor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteParams {
    pub ssh_host: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    pub ssh_username: String,
    /// Empty means key-based authentication
    #[serde(default)]
    pub ssh_password: String,
    pub remote_dir_path: String,
}

fn default_ssh_port() -> u16 {
    22
}

pub struct RemoteStorage {
    params: RemoteParams,
    executor: Arc<dyn CommandExecutor>,
}

impl RemoteStorage {
    pub fn new(params: RemoteParams, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { params, executor }
    }

    /// External programs this storage needs on `PATH`
    pub fn required_programs(&self) -> Vec<&'static str> {
        if self.params.ssh_password.is_empty() {
            vec!["scp"]
        } else {
            vec!["sshpass", "scp"]
        }
    }

    fn destination(&self, name: &str) -> String {
        format!(
            "{}@{}:{}/{}",
            self.params.ssh_username,
            self.params.ssh_host,
            self.params.remote_dir_path.trim_end_matches('/'),
            name
        )
    }

    /// Program and arguments for one upload
    fn invocation(&self, source: &Path, name: &str) -> (&'static str, Vec<String>) {
        let mut scp_args = vec![
            "-P".to_string(),
            self.params.ssh_port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        if self.params.ssh_password.is_empty() {
            scp_args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
        }
        scp_args.push(source.display().to_string());
        scp_args.push(self.destination(name));

        if self.params.ssh_password.is_empty() {
            ("scp", scp_args)
        } else {
            let mut args = vec!["-e".to_string(), "scp".to_string()];
            args.extend(scp_args);
            ("sshpass", args)
        }
    }
}

impl Storage for RemoteStorage {
    fn upload(&self, source: &Path, name: &str) -> Result<(), JobError> {
        info!("Uploading {:?} to {}", source, self.destination(name));

        let (program, args) = self.invocation(source, name);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let envs: Vec<(&str, &str)> = if self.params.ssh_password.is_empty() {
            Vec::new()
        } else {
            vec![("SSHPASS", self.params.ssh_password.as_str())]
        };

        self.executor
            .run_command(program, &args, &envs)
            .map_err(|e| JobError::upload(&self.describe(), e))?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "(Remote host: {}, directory path: {})",
            self.params.ssh_host, self.params.remote_dir_path
        )
    }
}
