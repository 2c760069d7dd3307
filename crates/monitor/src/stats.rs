use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shardkeeper_cluster::{NodeProbe, ProcessHealth, ProcessStats};
use shardkeeper_scheduler::{FixedIntervalTimer, SchedulerError, Task, TaskOutcome, TaskTimer};
use tracing::debug;

pub const STATS_JOB_NAME: &str = "process_stats";

/// Last sampled process statistics of the managed node.
///
/// Every field is optional; the default value means "unknown" and is what
/// readers see before the first sample and after a failed one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessStatsSnapshot {
    pub sampled_at: Option<DateTime<Utc>>,
    pub stats: ProcessStats,
}

impl ProcessStatsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sampled_at.is_none()
    }
}

/// Samples the local node's process statistics on a fixed interval.
pub struct ProcessStatsMonitor {
    probe: Arc<dyn NodeProbe>,
    health: ProcessHealth,
    snapshot: Arc<RwLock<ProcessStatsSnapshot>>,
    interval: Duration,
    timeout: Duration,
}

impl ProcessStatsMonitor {
    pub fn new(
        probe: Arc<dyn NodeProbe>,
        health: ProcessHealth,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            health,
            snapshot: Arc::new(RwLock::new(ProcessStatsSnapshot::default())),
            interval,
            timeout,
        }
    }

    /// Copy of the latest published snapshot.
    pub fn snapshot(&self) -> ProcessStatsSnapshot {
        self.snapshot
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Shared handle for readers outliving the job registration.
    pub fn snapshot_handle(&self) -> Arc<RwLock<ProcessStatsSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    fn publish(&self, snapshot: ProcessStatsSnapshot) {
        if let Ok(mut current) = self.snapshot.write() {
            *current = snapshot;
        }
    }
}

#[async_trait]
impl Task for ProcessStatsMonitor {
    fn name(&self) -> &str {
        STATS_JOB_NAME
    }

    async fn execute(&self) -> TaskOutcome {
        if !self.health.is_started() {
            return TaskOutcome::skipped("search process not started");
        }

        match self.probe.local_process_stats(self.timeout).await {
            Ok(stats) => {
                debug!(
                    open_fds = ?stats.open_file_descriptors,
                    cpu_percent = ?stats.cpu.percent,
                    resident_bytes = ?stats.mem.resident_in_bytes,
                    "sampled process stats"
                );
                self.publish(ProcessStatsSnapshot {
                    sampled_at: Some(Utc::now()),
                    stats,
                });
                TaskOutcome::succeeded("process stats sampled")
            }
            Err(e) => {
                self.publish(ProcessStatsSnapshot::default());
                TaskOutcome::failed(format!("cannot sample process stats: {e}"))
            }
        }
    }

    fn timer(&self) -> Result<Box<dyn TaskTimer>, SchedulerError> {
        Ok(Box::new(FixedIntervalTimer::new(self.interval)))
    }
}

#[cfg(test)]
mod tests {
    use shardkeeper_cluster::{CpuStats, InMemoryCluster};

    use super::*;

    fn sampler(cluster: &InMemoryCluster, health: &ProcessHealth) -> ProcessStatsMonitor {
        ProcessStatsMonitor::new(
            Arc::new(cluster.clone()),
            health.clone(),
            Duration::from_secs(60),
            Duration::from_millis(100),
        )
    }

    fn sample_stats() -> ProcessStats {
        ProcessStats {
            open_file_descriptors: Some(321),
            cpu: CpuStats {
                percent: Some(7),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skips_until_engine_started() {
        let cluster = InMemoryCluster::new();
        cluster.set_process_stats(sample_stats());
        let job = sampler(&cluster, &ProcessHealth::new());

        assert_eq!(job.execute().await.label(), "skipped");
        assert!(job.snapshot().is_empty());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn publishes_then_resets_on_failure() {
        let cluster = InMemoryCluster::new();
        cluster.set_process_stats(sample_stats());
        let health = ProcessHealth::new();
        health.set_started(true);
        let job = sampler(&cluster, &health);
        let reader = job.snapshot_handle();

        assert_eq!(job.execute().await.label(), "succeeded");
        let published = reader.read().unwrap().clone();
        assert!(published.sampled_at.is_some());
        assert_eq!(published.stats, sample_stats());

        cluster.set_reachable(false);
        assert!(job.execute().await.is_failure());
        assert_eq!(job.snapshot(), ProcessStatsSnapshot::default());
    }
}
