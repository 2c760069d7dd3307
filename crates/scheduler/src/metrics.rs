use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::TaskOutcome;

/// Per-job counters, updated after every invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobMetrics {
    pub executions: u64,
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Rolling average invocation duration.
    pub avg_duration: Duration,
    pub last_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<TaskOutcome>,
}

/// Scheduler operational metrics, keyed by job name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    pub jobs: BTreeMap<String, JobMetrics>,
}

impl SchedulerMetrics {
    /// Record a finished invocation.
    pub fn record_execution(&mut self, job: &str, duration: Duration, outcome: &TaskOutcome) {
        let entry = self.jobs.entry(job.to_string()).or_default();
        entry.executions += 1;
        match outcome {
            TaskOutcome::Succeeded { .. } => entry.succeeded += 1,
            TaskOutcome::Skipped { .. } => entry.skipped += 1,
            TaskOutcome::Failed { .. } => entry.failed += 1,
        }
        entry.last_run = Some(Utc::now());
        entry.last_outcome = Some(outcome.clone());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        entry.avg_duration = if entry.executions == 1 {
            duration
        } else {
            let prev_nanos = entry.avg_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / entry.executions as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }

    pub fn job(&self, name: &str) -> Option<&JobMetrics> {
        self.jobs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_single_execution() {
        let mut m = SchedulerMetrics::default();
        m.record_execution("sampler", Duration::from_millis(100), &TaskOutcome::succeeded("ok"));

        let job = m.job("sampler").unwrap();
        assert_eq!(job.executions, 1);
        assert_eq!(job.succeeded, 1);
        assert!(job.last_run.is_some());
        assert_eq!(job.avg_duration, Duration::from_millis(100));
    }

    #[test]
    fn record_multiple_executions_averages() {
        let mut m = SchedulerMetrics::default();
        m.record_execution("job", Duration::from_millis(100), &TaskOutcome::succeeded("ok"));
        m.record_execution("job", Duration::from_millis(200), &TaskOutcome::failed("boom"));

        let job = m.job("job").unwrap();
        assert_eq!(job.executions, 2);
        assert_eq!(job.failed, 1);
        let avg = job.avg_duration.as_millis();
        assert!((140..=160).contains(&avg), "expected ~150ms, got {}ms", avg);
        assert_eq!(job.last_outcome, Some(TaskOutcome::failed("boom")));
    }

    #[test]
    fn skips_are_counted_separately() {
        let mut m = SchedulerMetrics::default();
        m.record_execution("job", Duration::ZERO, &TaskOutcome::skipped("not leader"));
        let job = m.job("job").unwrap();
        assert_eq!((job.succeeded, job.skipped, job.failed), (0, 1, 0));
    }
}
