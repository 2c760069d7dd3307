use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::task::{Task, TaskOutcome};
use crate::timer::TaskTimer;

use super::execution::invoke;

/// A job as stored in the registry: the task plus the timer it runs on.
pub(super) struct Registration {
    pub(super) task: Arc<dyn Task>,
    pub(super) timer: Box<dyn TaskTimer>,
}

/// Registry of named periodic jobs.
///
/// Built once at startup, then consumed by [`start`](Scheduler::start).
/// Job names are unique; registering a name twice is an error.
pub struct Scheduler {
    pub(super) jobs: BTreeMap<String, Registration>,
    pub(super) metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
        }
    }

    /// Register a job on the timer its task provides.
    pub fn register(&mut self, task: Arc<dyn Task>) -> Result<(), SchedulerError> {
        let timer = task.timer()?;
        self.register_with_timer(task, timer)
    }

    /// Register a job on an explicit timer.
    pub fn register_with_timer(
        &mut self,
        task: Arc<dyn Task>,
        timer: Box<dyn TaskTimer>,
    ) -> Result<(), SchedulerError> {
        let name = task.name().to_string();
        if self.jobs.contains_key(&name) {
            return Err(SchedulerError::DuplicateJob(name));
        }

        info!(job = %name, timer = %timer.describe(), "registered job");
        self.jobs.insert(name, Registration { task, timer });
        Ok(())
    }

    /// Names of all registered jobs, sorted.
    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.keys().map(String::as_str).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Run one invocation of a registered job right now, outside its timer.
    pub async fn run_job_once(&self, name: &str) -> Result<TaskOutcome, SchedulerError> {
        let registration = self
            .jobs
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        Ok(invoke(name, &registration.task, &self.metrics).await)
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
