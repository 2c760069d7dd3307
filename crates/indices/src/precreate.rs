use std::time::Duration;

use shardkeeper_cluster::IndexAdmin;
use shardkeeper_core::CivilDate;
use tracing::{debug, info, warn};

use crate::error::LifecycleError;
use crate::policy::IndexPolicy;
use crate::report::PolicyReport;

/// Make sure the indices for today and the rest of the retention window
/// exist, oldest first. Existing indices are left untouched.
pub(crate) async fn precreate_indices(
    admin: &dyn IndexAdmin,
    policy: &IndexPolicy,
    today: CivilDate,
    timeout: Duration,
    verbose: bool,
    report: &mut PolicyReport,
) -> Result<(), LifecycleError> {
    for name in policy.precreation_targets(today)? {
        if admin.index_exists(&name, timeout).await? {
            if verbose {
                debug!(index = %name, "already present");
            }
            report.already_present += 1;
            continue;
        }

        let acknowledged = admin
            .create_index(&name, timeout)
            .await
            .map_err(|source| LifecycleError::CreateFailed {
                index: name.clone(),
                source,
            })?;
        if acknowledged {
            info!(policy = %policy.base_name(), index = %name, "pre-created index");
        } else {
            warn!(policy = %policy.base_name(), index = %name, "index creation not acknowledged");
        }
        report.created.push(name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use shardkeeper_cluster::{ClusterCall, InMemoryCluster};

    use super::*;
    use crate::error::ErrorKind;
    use crate::policy::parse_policies;

    const T: Duration = Duration::from_secs(5);

    fn policy(n: u32) -> IndexPolicy {
        parse_policies(&format!(
            r#"[{{"indexName":"logs","retentionPeriod":{n},"retentionType":"DAILY","preCreate":true}}]"#
        ))
        .unwrap()
        .remove(0)
    }

    fn today() -> CivilDate {
        CivilDate::from_ymd(2024, 1, 8).unwrap()
    }

    #[tokio::test]
    async fn checks_each_offset_in_order_and_creates_missing() {
        let cluster = InMemoryCluster::with_indices(["logs20240109"]);
        let mut report = PolicyReport::new("logs");

        precreate_indices(&cluster, &policy(3), today(), T, false, &mut report)
            .await
            .unwrap();

        assert_eq!(
            cluster.calls(),
            vec![
                ClusterCall::IndexExists("logs20240108".into()),
                ClusterCall::CreateIndex("logs20240108".into()),
                ClusterCall::IndexExists("logs20240109".into()),
                ClusterCall::IndexExists("logs20240110".into()),
                ClusterCall::CreateIndex("logs20240110".into()),
            ]
        );
        assert_eq!(report.created, vec!["logs20240108", "logs20240110"]);
        assert_eq!(report.already_present, 1);
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let cluster = InMemoryCluster::new();
        let mut first = PolicyReport::new("logs");
        precreate_indices(&cluster, &policy(3), today(), T, false, &mut first)
            .await
            .unwrap();
        assert_eq!(first.created.len(), 3);

        cluster.clear_calls();
        let mut second = PolicyReport::new("logs");
        precreate_indices(&cluster, &policy(3), today(), T, true, &mut second)
            .await
            .unwrap();

        assert!(second.created.is_empty());
        assert_eq!(second.already_present, 3);
        assert!(!cluster
            .calls()
            .iter()
            .any(|c| matches!(c, ClusterCall::CreateIndex(_))));
    }

    #[tokio::test]
    async fn unacknowledged_create_is_not_fatal() {
        let cluster = InMemoryCluster::new();
        cluster.unack_create("logs20240108");
        let mut report = PolicyReport::new("logs");

        precreate_indices(&cluster, &policy(2), today(), T, false, &mut report)
            .await
            .unwrap();
        assert_eq!(report.created, vec!["logs20240108", "logs20240109"]);
    }

    #[tokio::test]
    async fn separator_policies_create_names_their_filter_matches() {
        let policy = parse_policies(
            r#"[{"indexName":"logs","indexNameFilter":{"separator":"-"},
                "retentionPeriod":2,"retentionType":"DAILY","preCreate":true}]"#,
        )
        .unwrap()
        .remove(0);
        let cluster = InMemoryCluster::new();
        let mut report = PolicyReport::new("logs");

        precreate_indices(&cluster, &policy, today(), T, false, &mut report)
            .await
            .unwrap();

        assert_eq!(report.created, vec!["logs-20240108", "logs-20240109"]);
        assert!(report.created.iter().all(|name| policy.filter().matches(name)));
    }

    #[tokio::test]
    async fn failed_create_ends_the_pass() {
        let cluster = InMemoryCluster::new();
        cluster.fail_create("logs20240109");
        let mut report = PolicyReport::new("logs");

        let err = precreate_indices(&cluster, &policy(3), today(), T, false, &mut report)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Acknowledgment);
        assert!(err.to_string().contains("logs20240109"));
        assert_eq!(report.created, vec!["logs20240108"]);
        assert_eq!(cluster.index_names(), vec!["logs20240108"]);
    }
}
