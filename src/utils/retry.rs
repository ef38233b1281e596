//! Bounded retry with a fixed pause between attempts
//!
//! The backup pipeline applies this at two layers: once around a whole job
//! attempt and once around every storage upload and notifier call. The layers
//! compound, so a storage that always fails is called
//! `job.attempts * storage.attempts` times before the job gives up.

use std::fmt::Display;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Invoke an operation up to `attempts` times, sleeping between failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    sleep: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, sleep: Duration) -> Self {
        Self { attempts, sleep }
    }

    pub const fn from_secs(attempts: u32, sleep_seconds: u64) -> Self {
        Self::new(attempts, Duration::from_secs(sleep_seconds))
    }

    /// Single attempt, no sleeping
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Maximum number of invocations (at least one)
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    pub fn sleep(&self) -> Duration {
        self.sleep
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// The error of the last invocation is returned as-is.
    pub fn run<T, E, F>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", label, attempt, attempts, e);

                    if attempt >= attempts {
                        return Err(e);
                    }

                    info!(
                        "Sleeping {:?} before retrying {} ({} attempts left)",
                        self.sleep,
                        label,
                        attempts - attempt
                    );
                    thread::sleep(self.sleep);
                    attempt += 1;
                }
            }
        }
    }
}
