use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shardkeeper_cluster::{NodeProbe, ProcessHealth};
use shardkeeper_scheduler::{FixedIntervalTimer, SchedulerError, Task, TaskOutcome, TaskTimer};
use tracing::{info, warn};

pub const HEALTH_JOB_NAME: &str = "engine_health";

/// Pings the managed node and keeps [`ProcessHealth`] in step with it.
pub struct EngineHealthMonitor {
    probe: Arc<dyn NodeProbe>,
    health: ProcessHealth,
    interval: Duration,
    timeout: Duration,
}

impl EngineHealthMonitor {
    pub fn new(
        probe: Arc<dyn NodeProbe>,
        health: ProcessHealth,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            health,
            interval,
            timeout,
        }
    }

    /// Probe once and update the flag. Returns whether the engine is up.
    pub async fn probe_once(&self) -> bool {
        let result = self.probe.ping(self.timeout).await;
        let up = result.is_ok();
        let was_up = self.health.set_started(up);

        match (&result, was_up) {
            (Ok(()), false) => info!("search process is up"),
            (Err(e), true) => warn!(error = %e, "search process went down"),
            _ => {}
        }
        up
    }
}

#[async_trait]
impl Task for EngineHealthMonitor {
    fn name(&self) -> &str {
        HEALTH_JOB_NAME
    }

    async fn execute(&self) -> TaskOutcome {
        if self.probe_once().await {
            TaskOutcome::succeeded("engine reachable")
        } else {
            TaskOutcome::skipped("engine unreachable")
        }
    }

    fn timer(&self) -> Result<Box<dyn TaskTimer>, SchedulerError> {
        Ok(Box::new(FixedIntervalTimer::new(self.interval)))
    }
}
