//! Isolated execution units for scheduled jobs
//!
//! The scheduler never runs a job in its own process. Every dispatch goes
//! through a [`Dispatcher`], which in production re-executes the daemon binary
//! as `cron-backup --config <path> run --job <name>`. A crashing or hanging job
//! therefore only affects its own child process.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, error, info, warn};

/// A running job dispatch
pub trait ExecutionUnit: Send {
    /// Human-readable identifier for logs (e.g. `pid 4242`)
    fn id(&self) -> String;

    /// Non-blocking check whether the unit has stopped, successfully or not
    fn has_terminated(&mut self) -> bool;

    /// Block until the unit stops; `true` when it exited successfully
    fn wait(&mut self) -> Result<bool>;
}

/// Starts execution units for named jobs
pub trait Dispatcher {
    fn dispatch(&self, job: &str) -> Result<Box<dyn ExecutionUnit>>;
}

/// Dispatches each job as a child process
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ProcessDispatcher {
    /// Run `program base_args... run --job <name>` for every dispatch
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// Re-execute the current binary against the same configuration file
    pub fn for_current_exe(config_path: &Path) -> Result<Self> {
        let program = env::current_exe().context("Failed to get current executable path")?;
        Ok(Self::new(
            program,
            vec!["--config".to_string(), config_path.display().to_string()],
        ))
    }

    fn command(&self, job: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(["run", "--job", job])
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Dispatcher for ProcessDispatcher {
    fn dispatch(&self, job: &str) -> Result<Box<dyn ExecutionUnit>> {
        let child = self
            .command(job)
            .spawn()
            .with_context(|| format!("Failed to spawn execution unit for job '{}'", job))?;

        Ok(Box::new(ChildUnit {
            job: job.to_string(),
            child,
        }))
    }
}

struct ChildUnit {
    job: String,
    child: Child,
}

impl ExecutionUnit for ChildUnit {
    fn id(&self) -> String {
        format!("pid {}", self.child.id())
    }

    fn has_terminated(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                // The child can no longer be observed; stop tracking it
                warn!("Failed to poll execution unit for job '{}': {}", self.job, e);
                true
            }
        }
    }

    fn wait(&mut self) -> Result<bool> {
        let status = self
            .child
            .wait()
            .with_context(|| format!("Failed to wait for job '{}'", self.job))?;
        debug!("Job '{}' exited with {}", self.job, status);
        Ok(status.success())
    }
}

/// Dispatch every job at once and block until all of them stop.
///
/// Returns the names of jobs that failed to start or exited unsuccessfully.
pub fn dispatch_and_wait(dispatcher: &dyn Dispatcher, jobs: &[String]) -> Vec<String> {
    let mut failed = Vec::new();
    let mut units = Vec::new();

    for job in jobs {
        match dispatcher.dispatch(job) {
            Ok(unit) => {
                info!("Started job '{}' as {}", job, unit.id());
                units.push((job, unit));
            }
            Err(e) => {
                error!("{:#}", e);
                failed.push(job.clone());
            }
        }
    }

    for (job, mut unit) in units {
        match unit.wait() {
            Ok(true) => info!("Job '{}' finished", job),
            Ok(false) => {
                error!("Job '{}' exited unsuccessfully", job);
                failed.push(job.clone());
            }
            Err(e) => {
                error!("{:#}", e);
                failed.push(job.clone());
            }
        }
    }

    failed
}

/// In-memory dispatcher for testing the scheduler
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Recorded dispatch
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct DispatchCall {
        pub job: String,
        pub sequence: usize,
    }

    /// Mock dispatcher whose units stay running until told to finish
    #[derive(Clone, Default)]
    pub struct MockDispatcher {
        pub calls: Arc<Mutex<Vec<DispatchCall>>>,
        units: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
        /// Jobs whose spawn fails
        failing_jobs: Arc<Mutex<Vec<String>>>,
        /// Units terminate as soon as they are dispatched
        instant_exit: bool,
    }

    impl MockDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Units report terminated on their first poll
        pub fn with_instant_exit(mut self) -> Self {
            self.instant_exit = true;
            self
        }

        /// Spawning units for `job` fails
        pub fn failing_for(self, job: &str) -> Self {
            self.failing_jobs.lock().unwrap().push(job.to_string());
            self
        }

        /// Names of dispatched jobs, in dispatch order
        pub fn dispatched(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.job.clone())
                .collect()
        }

        pub fn dispatch_count(&self, job: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.job == job)
                .count()
        }

        /// Let every unit dispatched so far terminate
        pub fn finish_all(&self) {
            for unit in self.units.lock().unwrap().iter() {
                unit.store(true, Ordering::SeqCst);
            }
        }
    }

    struct MockUnit {
        sequence: usize,
        done: Arc<AtomicBool>,
    }

    impl ExecutionUnit for MockUnit {
        fn id(&self) -> String {
            format!("mock {}", self.sequence)
        }

        fn has_terminated(&mut self) -> bool {
            self.done.load(Ordering::SeqCst)
        }

        fn wait(&mut self) -> Result<bool> {
            self.done.store(true, Ordering::SeqCst);
            Ok(true)
        }
    }

    impl Dispatcher for MockDispatcher {
        fn dispatch(&self, job: &str) -> Result<Box<dyn ExecutionUnit>> {
            if self.failing_jobs.lock().unwrap().iter().any(|j| j == job) {
                anyhow::bail!("Failed to spawn execution unit for job '{}'", job);
            }

            let mut calls = self.calls.lock().unwrap();
            let sequence = calls.len();
            calls.push(DispatchCall {
                job: job.to_string(),
                sequence,
            });

            let done = Arc::new(AtomicBool::new(self.instant_exit));
            self.units.lock().unwrap().push(done.clone());

            Ok(Box::new(MockUnit { sequence, done }))
        }
    }
}
