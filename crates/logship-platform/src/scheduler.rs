//! Fixed-interval job scheduling.
//!
//! A [`Scheduler`] owns every job it starts. Each job runs on its own tokio
//! task and is invoked once per interval until it is cancelled, either
//! individually through its [`JobHandle`] or all at once with
//! [`Scheduler::close`]. Cancellation stops future ticks but never interrupts
//! a job that is already running.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Runs jobs at fixed intervals.
pub struct Scheduler {
    root: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a single scheduled job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    name: String,
    token: CancellationToken,
}

impl JobHandle {
    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops future ticks of this job.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the job was cancelled, directly or by its scheduler.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler with no jobs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Schedules `job` to run every `interval`, starting one interval from now.
    ///
    /// The job receives a token that is cancelled when the job is stopped.
    /// Errors returned by the job are logged; they never stop later ticks.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut, E>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        job: F,
    ) -> JobHandle
    where
        F: Fn(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        let handle = JobHandle {
            name: name.into(),
            token: self.root.child_token(),
        };
        let period = interval.max(Duration::from_millis(1));
        let token = handle.token.clone();
        let name = handle.name.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(job = %name, interval_ms = period.as_millis(), "job scheduled");

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(e) = job(token.clone()).await {
                    error!(job = %name, error = %e, "scheduled job failed");
                }
            }

            debug!(job = %name, "job stopped");
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        handle
    }

    /// Returns the number of jobs that are still running.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Cancels all scheduled jobs.
    pub fn close(&self) {
        self.root.cancel();
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
