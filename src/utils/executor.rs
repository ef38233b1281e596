//! Command execution abstraction for testability
//!
//! Targets and storages that shell out (`pg_dump`, `scp`) go through this
//! trait so tests can record invocations and script failures.

use anyhow::Result;
use std::process::Output;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command with extra environment variables, failing on a non-zero exit status
    fn run_command(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output>;

    /// Check whether a program can be found
    fn is_available(&self, program: &str) -> bool;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_command(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
        super::command::run_command(program, args, envs)
    }

    fn is_available(&self, program: &str) -> bool {
        super::command::program_available(program)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String },
        Failure { stderr: String, exit_code: i32 },
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Programs reported as missing by `is_available`
        missing: Arc<Mutex<Vec<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Make every call to `program` exit with the given status
        pub fn failing(self, program: &str, exit_code: i32) -> Self {
            self.expect(
                program,
                MockResponse::Failure {
                    stderr: format!("{} exited with status {}", program, exit_code),
                    exit_code,
                },
            )
        }

        /// Report `program` as not installed
        pub fn without_program(self, program: &str) -> Self {
            self.missing.lock().unwrap().push(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_command(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                envs: envs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });

            let response = self
                .responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_default();

            match response {
                MockResponse::Success { stdout } => Ok(Output {
                    status: std::process::ExitStatus::default(),
                    stdout: stdout.into_bytes(),
                    stderr: Vec::new(),
                }),
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", Some(exit_code), stderr)
                }
            }
        }

        fn is_available(&self, program: &str) -> bool {
            !self.missing.lock().unwrap().iter().any(|p| p == program)
        }
    }
}
