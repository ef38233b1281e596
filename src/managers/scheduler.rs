//! Cron scheduler - fires jobs as isolated execution units
//!
//! The scheduler owns one [`Trigger`] per scheduled job and is driven by
//! [`CronScheduler::tick`]. Due jobs are handed to a [`Dispatcher`] and never
//! awaited; the scheduler only reaps units that have already stopped.

use crate::utils::cron::{next_after, parse_schedule};
use crate::utils::{Dispatcher, ExecutionUnit};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::mem;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default pause between two ticks of the daemon loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// An armed cron trigger bound to a job
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: String,
    schedule: Schedule,
    next_fire: DateTime<Utc>,
    job: String,
}

impl Trigger {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn next_fire(&self) -> DateTime<Utc> {
        self.next_fire
    }

    pub fn job(&self) -> &str {
        &self.job
    }
}

struct RunningUnit {
    job: String,
    unit: Box<dyn ExecutionUnit>,
}

pub struct CronScheduler<D: Dispatcher> {
    dispatcher: D,
    triggers: Vec<Trigger>,
    running: Vec<RunningUnit>,
}

impl<D: Dispatcher> CronScheduler<D> {
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            triggers: Vec::new(),
            running: Vec::new(),
        }
    }

    /// Arm a trigger for `job`, first firing strictly after `registered_at`
    pub fn schedule_at(
        &mut self,
        expression: &str,
        job: &str,
        registered_at: DateTime<Utc>,
    ) -> Result<()> {
        let schedule = parse_schedule(expression)?;
        let next_fire = next_after(&schedule, registered_at).with_context(|| {
            format!(
                "Cron expression '{}' for job '{}' has no upcoming occurrence",
                expression, job
            )
        })?;

        info!("Scheduled job '{}' ({}), next run at {}", job, expression, next_fire);

        self.triggers.push(Trigger {
            expression: expression.to_string(),
            schedule,
            next_fire,
            job: job.to_string(),
        });
        Ok(())
    }

    /// Arm a trigger for each `(expression, job)` pair.
    ///
    /// A pair that cannot be armed is logged and skipped so the remaining
    /// jobs still run. Returns the number of triggers armed.
    pub fn schedule_all<'a, I>(&mut self, jobs: I, registered_at: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut armed = 0;
        for (expression, job) in jobs {
            match self.schedule_at(expression, job, registered_at) {
                Ok(()) => armed += 1,
                Err(e) => error!("Skipping job '{}': {:#}", job, e),
            }
        }
        armed
    }

    /// Dispatch every due job, advance or retire its trigger and reap
    /// finished units. Returns the number of units started.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let mut started = 0;

        for mut trigger in mem::take(&mut self.triggers) {
            if trigger.next_fire > now {
                self.triggers.push(trigger);
                continue;
            }

            match self.dispatcher.dispatch(&trigger.job) {
                Ok(unit) => {
                    info!("Dispatched job '{}' as {}", trigger.job, unit.id());
                    self.running.push(RunningUnit {
                        job: trigger.job.clone(),
                        unit,
                    });
                    started += 1;
                }
                Err(e) => error!("Failed to dispatch job '{}': {:#}", trigger.job, e),
            }

            // Next occurrence after the slot that just fired, not after `now`
            match next_after(&trigger.schedule, trigger.next_fire) {
                Some(next) => {
                    debug!("Next run of job '{}' at {}", trigger.job, next);
                    trigger.next_fire = next;
                    self.triggers.push(trigger);
                }
                None => info!(
                    "Cron expression '{}' exhausted, retiring job '{}'",
                    trigger.expression, trigger.job
                ),
            }
        }

        self.reap();
        started
    }

    fn reap(&mut self) {
        self.running.retain_mut(|running| {
            if running.unit.has_terminated() {
                debug!("Reaped job '{}' ({})", running.job, running.unit.id());
                false
            } else {
                true
            }
        });
    }

    /// Tick forever, sleeping `poll_interval` between ticks
    pub fn run(&mut self, poll_interval: Duration) -> ! {
        info!(
            "Scheduler started with {} trigger(s), polling every {:?}",
            self.triggers.len(),
            poll_interval
        );

        loop {
            self.tick(Utc::now());
            thread::sleep(poll_interval);
        }
    }

    /// Armed (not yet retired) triggers
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn next_fire(&self, job: &str) -> Option<DateTime<Utc>> {
        self.triggers
            .iter()
            .find(|t| t.job == job)
            .map(|t| t.next_fire)
    }

    /// Dispatched units not yet reaped
    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }
}
