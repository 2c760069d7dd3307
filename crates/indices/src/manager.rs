use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shardkeeper_cluster::{IndexAdmin, LeadershipCheck, ProcessHealth};
use shardkeeper_core::{CivilDate, IndexManagementConfig, PolicyFailureMode};
use shardkeeper_scheduler::{DailyTimer, SchedulerError, Task, TaskOutcome, TaskTimer};
use tracing::{debug, info, warn};

use crate::error::LifecycleError;
use crate::policy::{parse_document, PolicySpec};
use crate::precreate::precreate_indices;
use crate::report::{CycleOutcome, CycleReport, PolicyReport};
use crate::retention::enforce_retention;

/// Registry name of the lifecycle job.
pub const JOB_NAME: &str = "index_lifecycle";

/// Source of the index management settings, consulted once per cycle.
pub trait SettingsSource: Send + Sync {
    fn load(&self) -> IndexManagementConfig;
}

/// Re-reads the environment (and the policy file, if any) on every cycle.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    profile: String,
}

impl EnvSettings {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }
}

impl SettingsSource for EnvSettings {
    fn load(&self) -> IndexManagementConfig {
        IndexManagementConfig::from_env_profiled(&self.profile)
    }
}

/// Fixed settings.
impl SettingsSource for IndexManagementConfig {
    fn load(&self) -> IndexManagementConfig {
        self.clone()
    }
}

/// Deletes expired indices and pre-creates upcoming ones, once a day, from
/// the elected master only.
pub struct IndexLifecycleManager {
    admin: Arc<dyn IndexAdmin>,
    leadership: Arc<dyn LeadershipCheck>,
    health: ProcessHealth,
    settings: Arc<dyn SettingsSource>,
    leader_timeout: Duration,
}

impl IndexLifecycleManager {
    pub fn new(
        admin: Arc<dyn IndexAdmin>,
        leadership: Arc<dyn LeadershipCheck>,
        health: ProcessHealth,
        settings: Arc<dyn SettingsSource>,
    ) -> Self {
        Self {
            admin,
            leadership,
            health,
            settings,
            leader_timeout: Duration::from_secs(5),
        }
    }

    /// Timeout for the leadership query (admin calls use the configured one).
    pub fn with_leader_timeout(mut self, timeout: Duration) -> Self {
        self.leader_timeout = timeout;
        self
    }

    /// Run one cycle as if the local date were `today`.
    pub async fn run_cycle(&self, today: CivilDate) -> CycleOutcome {
        if !self.health.is_started() {
            return CycleOutcome::Skipped("search process not started".to_string());
        }

        match self.leadership.is_current_node_leader(self.leader_timeout).await {
            Ok(true) => {}
            Ok(false) => {
                return CycleOutcome::Skipped("local node is not the elected master".to_string())
            }
            Err(e) => {
                warn!(error = %e, timed_out = e.is_timeout(), "leadership check failed");
                return CycleOutcome::Failed(e.into());
            }
        }

        let settings = self.settings.load();
        if !settings.auto_creation_enabled {
            return CycleOutcome::Skipped("index auto creation disabled".to_string());
        }

        let specs = match settings
            .policy_document()
            .map_err(LifecycleError::from)
            .and_then(|doc| parse_document(&doc))
        {
            Ok(specs) => specs,
            Err(e) => {
                warn!(error = %e, "cannot load index policies");
                return CycleOutcome::Failed(e);
            }
        };

        // In abort mode an invalid policy fails the cycle before any change.
        if settings.failure_mode == PolicyFailureMode::Abort {
            if let Err(e) = specs.iter().try_for_each(|spec| spec.validate().map(drop)) {
                warn!(error = %e, "invalid index policy, cycle aborted");
                return CycleOutcome::Failed(e);
            }
        }

        info!(
            policies = specs.len(),
            today = %today,
            failure_mode = %settings.failure_mode,
            "starting index lifecycle cycle"
        );

        let report = self.apply_policies(&specs, today, &settings).await;
        if report.has_failures() {
            CycleOutcome::PartiallyFailed(report)
        } else {
            CycleOutcome::Succeeded(report)
        }
    }

    async fn apply_policies(
        &self,
        specs: &[PolicySpec],
        today: CivilDate,
        settings: &IndexManagementConfig,
    ) -> CycleReport {
        let mut report = CycleReport::default();

        for (position, spec) in specs.iter().enumerate() {
            let mut policy_report = PolicyReport::new(spec.index_name.trim());
            let result = self
                .apply_policy(spec, today, settings, &mut policy_report)
                .await;

            if let Err(e) = result {
                warn!(
                    policy = %policy_report.index_name,
                    kind = e.kind().as_str(),
                    error = %e,
                    "index policy failed"
                );
                policy_report.error = Some(e.to_string());
                report.policies.push(policy_report);

                if settings.failure_mode == PolicyFailureMode::Abort {
                    report.unprocessed = specs[position + 1..]
                        .iter()
                        .map(|s| s.index_name.trim().to_string())
                        .collect();
                    if !report.unprocessed.is_empty() {
                        warn!(
                            remaining = report.unprocessed.len(),
                            "aborting remaining policies for this cycle"
                        );
                    }
                    break;
                }
                continue;
            }

            report.policies.push(policy_report);
        }

        report
    }

    /// Retention first; precreation only if retention went through.
    async fn apply_policy(
        &self,
        spec: &PolicySpec,
        today: CivilDate,
        settings: &IndexManagementConfig,
        report: &mut PolicyReport,
    ) -> Result<(), LifecycleError> {
        let policy = spec.validate()?;
        let verbose = settings.debug_logging_enabled;
        let timeout = settings.timeout();

        if verbose {
            debug!(
                policy = %policy.base_name(),
                granularity = %policy.granularity(),
                retention_period = policy.retention_period(),
                pre_create = policy.pre_create(),
                "applying index policy"
            );
        }

        enforce_retention(self.admin.as_ref(), &policy, today, timeout, verbose, report).await?;

        if policy.pre_create() {
            precreate_indices(self.admin.as_ref(), &policy, today, timeout, verbose, report)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Task for IndexLifecycleManager {
    fn name(&self) -> &str {
        JOB_NAME
    }

    async fn execute(&self) -> TaskOutcome {
        self.run_cycle(CivilDate::today()).await.into()
    }

    /// Daily at `{scheduled_hour}:01:00` local time.
    fn timer(&self) -> Result<Box<dyn TaskTimer>, SchedulerError> {
        let hour = self.settings.load().scheduled_hour;
        Ok(Box::new(DailyTimer::new(hour, 1, 0)?))
    }
}

#[cfg(test)]
mod tests {
    use shardkeeper_cluster::{ClusterCall, InMemoryCluster};

    use super::*;
    use crate::error::ErrorKind;

    fn settings(metadata: &str) -> IndexManagementConfig {
        IndexManagementConfig {
            auto_creation_enabled: true,
            metadata: metadata.to_string(),
            debug_logging_enabled: true,
            ..Default::default()
        }
    }

    fn manager(cluster: &InMemoryCluster, settings: IndexManagementConfig) -> IndexLifecycleManager {
        let health = ProcessHealth::new();
        health.set_started(true);
        IndexLifecycleManager::new(
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            health,
            Arc::new(settings),
        )
    }

    fn jan(day: u32) -> CivilDate {
        CivilDate::from_ymd(2024, 1, day).unwrap()
    }

    const METRICS: &str =
        r#"[{"indexName":"metrics","retentionType":"DAILY","retentionPeriod":7,"preCreate":true}]"#;

    #[tokio::test]
    async fn metrics_scenario() {
        let cluster = InMemoryCluster::with_indices((1..=5).map(|d| format!("metrics2024010{d}")));
        let outcome = manager(&cluster, settings(METRICS)).run_cycle(jan(8)).await;

        let report = match outcome {
            CycleOutcome::Succeeded(report) => report,
            other => panic!("expected success, got {other:?}"),
        };
        let policy = &report.policies[0];
        assert_eq!(policy.cutoff, Some(20240101));
        assert_eq!(policy.deleted, vec!["metrics20240101"]);
        assert_eq!(
            policy.created,
            (8..=14).map(|d| format!("metrics202401{d:02}")).collect::<Vec<_>>()
        );

        let mut expected: Vec<String> = (2..=5)
            .chain(8..=14)
            .map(|d| format!("metrics202401{d:02}"))
            .collect();
        expected.sort();
        assert_eq!(cluster.index_names(), expected);
    }

    #[tokio::test]
    async fn not_leader_makes_no_admin_calls() {
        let cluster = InMemoryCluster::with_indices(["metrics20200101"]);
        cluster.set_leader(false);

        let outcome = manager(&cluster, settings(METRICS)).run_cycle(jan(8)).await;

        assert!(matches!(outcome, CycleOutcome::Skipped(_)));
        assert!(cluster.admin_calls().is_empty());
        assert_eq!(cluster.calls(), vec![ClusterCall::LeaderCheck]);
    }

    #[tokio::test]
    async fn engine_not_started_makes_no_calls_at_all() {
        let cluster = InMemoryCluster::new();
        let mgr = IndexLifecycleManager::new(
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            ProcessHealth::new(),
            Arc::new(settings(METRICS)),
        );

        assert!(matches!(mgr.run_cycle(jan(8)).await, CycleOutcome::Skipped(_)));
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn disabled_maintenance_is_skipped() {
        let cluster = InMemoryCluster::with_indices(["metrics20200101"]);
        let mut disabled = settings(METRICS);
        disabled.auto_creation_enabled = false;

        let outcome = manager(&cluster, disabled).run_cycle(jan(8)).await;

        assert!(matches!(outcome, CycleOutcome::Skipped(_)));
        assert!(cluster.admin_calls().is_empty());
    }

    #[tokio::test]
    async fn leadership_transport_error_fails_the_cycle() {
        let cluster = InMemoryCluster::new();
        cluster.fail_leader_check(true);

        let outcome = manager(&cluster, settings(METRICS)).run_cycle(jan(8)).await;

        match outcome {
            CycleOutcome::Failed(e) => assert_eq!(e.kind(), ErrorKind::Transport),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(cluster.admin_calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_document_fails_the_cycle() {
        let cluster = InMemoryCluster::new();
        let outcome = manager(&cluster, settings("not json")).run_cycle(jan(8)).await;

        match outcome {
            CycleOutcome::Failed(e) => assert_eq!(e.kind(), ErrorKind::Configuration),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(cluster.admin_calls().is_empty());
    }

    const THREE_POLICIES: &str = r#"[
        {"indexName":"alpha","retentionType":"DAILY","retentionPeriod":1},
        {"indexName":"beta","retentionType":"DAILY","retentionPeriod":1},
        {"indexName":"gamma","retentionType":"DAILY","retentionPeriod":1}
    ]"#;

    #[tokio::test]
    async fn abort_mode_stops_at_first_failing_policy() {
        let cluster =
            InMemoryCluster::with_indices(["alpha20200101", "beta20200101", "gamma20200101"]);
        cluster.reject_delete("beta20200101");

        let outcome = manager(&cluster, settings(THREE_POLICIES))
            .run_cycle(jan(8))
            .await;

        let report = match outcome {
            CycleOutcome::PartiallyFailed(report) => report,
            other => panic!("expected partial failure, got {other:?}"),
        };
        assert_eq!(report.policies.len(), 2);
        assert_eq!(report.policies[0].deleted, vec!["alpha20200101"]);
        assert!(report.policies[1].error.is_some());
        assert_eq!(report.unprocessed, vec!["gamma"]);
        assert!(cluster.index_names().contains(&"gamma20200101".to_string()));
    }

    #[tokio::test]
    async fn continue_mode_isolates_failing_policy() {
        let cluster =
            InMemoryCluster::with_indices(["alpha20200101", "beta20200101", "gamma20200101"]);
        cluster.reject_delete("beta20200101");
        let mut isolated = settings(THREE_POLICIES);
        isolated.failure_mode = PolicyFailureMode::Continue;

        let outcome = manager(&cluster, isolated).run_cycle(jan(8)).await;

        let report = match outcome {
            CycleOutcome::PartiallyFailed(report) => report,
            other => panic!("expected partial failure, got {other:?}"),
        };
        assert_eq!(report.policies.len(), 3);
        assert_eq!(report.failures().count(), 1);
        assert!(report.unprocessed.is_empty());
        assert_eq!(cluster.index_names(), vec!["beta20200101"]);
    }

    #[tokio::test]
    async fn invalid_policy_counts_as_policy_failure() {
        let cluster = InMemoryCluster::with_indices(["beta20200101"]);
        let mut isolated = settings(
            r#"[{"indexName":"alpha","retentionType":"WEEKLY","retentionPeriod":1},
                {"indexName":"beta","retentionType":"DAILY","retentionPeriod":1}]"#,
        );
        isolated.failure_mode = PolicyFailureMode::Continue;

        let outcome = manager(&cluster, isolated).run_cycle(jan(8)).await;

        let report = match outcome {
            CycleOutcome::PartiallyFailed(report) => report,
            other => panic!("expected partial failure, got {other:?}"),
        };
        assert!(report.policies[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("WEEKLY")));
        assert_eq!(report.policies[1].deleted, vec!["beta20200101"]);
    }

    #[tokio::test]
    async fn invalid_policy_in_abort_mode_fails_before_any_change() {
        let cluster = InMemoryCluster::with_indices(["alpha20200101"]);
        let outcome = manager(
            &cluster,
            settings(
                r#"[{"indexName":"alpha","retentionType":"DAILY","retentionPeriod":1},
                    {"indexName":"beta","retentionType":"WEEKLY","retentionPeriod":1}]"#,
            ),
        )
        .run_cycle(jan(8))
        .await;

        let err = match outcome {
            CycleOutcome::Failed(e) => e,
            other => panic!("expected failed cycle, got {other:?}"),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("WEEKLY"));
        assert!(cluster.admin_calls().is_empty());
        assert_eq!(cluster.index_names(), vec!["alpha20200101"]);
    }

    #[tokio::test]
    async fn retention_failure_skips_precreation() {
        let cluster = InMemoryCluster::with_indices(["metrics20200101"]);
        cluster.reject_delete("metrics20200101");

        let outcome = manager(&cluster, settings(METRICS)).run_cycle(jan(8)).await;

        assert!(matches!(outcome, CycleOutcome::PartiallyFailed(_)));
        assert!(!cluster
            .admin_calls()
            .iter()
            .any(|c| matches!(c, ClusterCall::IndexExists(_) | ClusterCall::CreateIndex(_))));
    }

    #[tokio::test]
    async fn policies_are_reloaded_every_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.json");
        std::fs::write(&path, "[]").unwrap();

        let cluster = InMemoryCluster::with_indices(["metrics20200101"]);
        let mut file_backed = settings("[]");
        file_backed.metadata_file = Some(path.clone());
        let mgr = manager(&cluster, file_backed);

        let first = mgr.run_cycle(jan(8)).await;
        assert_eq!(first.report().map(|r| r.policies.len()), Some(0));

        std::fs::write(&path, METRICS).unwrap();
        let second = mgr.run_cycle(jan(8)).await;
        assert_eq!(second.report().map(|r| r.deleted_count()), Some(1));
    }

    #[tokio::test]
    async fn execute_maps_skip_to_task_outcome() {
        let cluster = InMemoryCluster::new();
        cluster.set_leader(false);
        let outcome = manager(&cluster, settings(METRICS)).execute().await;
        assert_eq!(outcome.label(), "skipped");
    }

    #[test]
    fn timer_fires_at_configured_hour() {
        let cluster = InMemoryCluster::new();
        let mut at_three = settings("[]");
        at_three.scheduled_hour = 3;
        let timer = manager(&cluster, at_three).timer().unwrap();
        assert_eq!(timer.describe(), "daily at 03:01:00");

        let mut bad = settings("[]");
        bad.scheduled_hour = 24;
        assert!(manager(&cluster, bad).timer().is_err());
    }
}
