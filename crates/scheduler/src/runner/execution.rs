use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Level};

use crate::metrics::SchedulerMetrics;
use crate::task::{Task, TaskOutcome};

use super::core::{Registration, Scheduler};

/// Handle to a running scheduler. Dropping it without calling
/// [`shutdown`](SchedulerHandle::shutdown) also stops the job loops once
/// their current sleep or invocation ends.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    jobs: Vec<(String, JoinHandle<()>)>,
    metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl SchedulerHandle {
    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Stop all job loops and wait for in-flight invocations to finish.
    pub async fn shutdown(self) {
        info!("Scheduler shutdown requested");
        let _ = self.shutdown.send(true);

        for (name, handle) in self.jobs {
            if let Err(e) = handle.await {
                error!(job = %name, error = %e, "job loop terminated abnormally");
            }
        }

        info!("Scheduler stopped");
    }
}

impl Scheduler {
    /// Spawn one loop per registered job on the current tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        info!("Scheduler starting with {} registered jobs", self.jobs.len());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let jobs = self
            .jobs
            .into_iter()
            .map(|(name, registration)| {
                let handle = tokio::spawn(run_job(
                    name.clone(),
                    registration,
                    shutdown_rx.clone(),
                    Arc::clone(&self.metrics),
                ));
                (name, handle)
            })
            .collect();

        SchedulerHandle {
            shutdown: shutdown_tx,
            jobs,
            metrics: self.metrics,
        }
    }
}

/// Loop for a single job: wait for the timer, invoke, record, repeat.
///
/// The invocation is awaited before the next delay is computed, so a job
/// that overruns its period simply starts its next cycle late.
async fn run_job(
    name: String,
    registration: Registration,
    mut shutdown: watch::Receiver<bool>,
    metrics: Arc<RwLock<SchedulerMetrics>>,
) {
    let mut previous: Option<TaskOutcome> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let delay = registration.timer.next_delay(Local::now(), previous.as_ref());
        debug!(job = %name, delay_ms = delay.as_millis() as u64, "next run scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        previous = Some(invoke(&name, &registration.task, &metrics).await);
    }

    info!(job = %name, "job stopped");
}

/// Invoke a task in its own tokio task so a panic is contained, then log
/// and record the outcome.
pub(super) async fn invoke(
    name: &str,
    task: &Arc<dyn Task>,
    metrics: &RwLock<SchedulerMetrics>,
) -> TaskOutcome {
    let started = Instant::now();
    let task = Arc::clone(task);

    let (outcome, panicked) = match tokio::spawn(async move { task.execute().await }).await {
        Ok(outcome) => (outcome, false),
        Err(e) if e.is_panic() => (TaskOutcome::failed(format!("task panicked: {e}")), true),
        Err(e) => (TaskOutcome::failed(format!("task cancelled: {e}")), false),
    };
    let duration = started.elapsed();

    log_outcome(name, &outcome, duration, panicked);

    if let Ok(mut m) = metrics.write() {
        m.record_execution(name, duration, &outcome);
    }

    outcome
}

/// Level an invocation is logged at. Panics are errors; plain failures warn.
pub(super) fn outcome_level(outcome: &TaskOutcome, panicked: bool) -> Level {
    match outcome {
        _ if panicked => Level::ERROR,
        TaskOutcome::Succeeded { .. } => Level::INFO,
        TaskOutcome::Skipped { .. } => Level::DEBUG,
        TaskOutcome::Failed { .. } => Level::WARN,
    }
}

fn log_outcome(name: &str, outcome: &TaskOutcome, duration: Duration, panicked: bool) {
    let duration_ms = duration.as_millis() as u64;
    match (outcome_level(outcome, panicked), outcome) {
        (Level::ERROR, outcome) => {
            error!(job = %name, duration_ms, outcome = %outcome, "job panicked")
        }
        (_, TaskOutcome::Succeeded { detail }) => {
            info!(job = %name, duration_ms, detail = %detail, "job completed")
        }
        (_, TaskOutcome::Skipped { reason }) => {
            debug!(job = %name, duration_ms, reason = %reason, "job skipped")
        }
        (_, TaskOutcome::Failed { error }) => {
            warn!(job = %name, duration_ms, error = %error, "job failed")
        }
    }
}
