use std::time::Duration;

use shardkeeper_cluster::IndexAdmin;
use shardkeeper_core::CivilDate;
use tracing::{debug, info};

use crate::error::LifecycleError;
use crate::policy::IndexPolicy;
use crate::report::PolicyReport;

/// Delete every index of `policy` whose date suffix is at or before the
/// cutoff. Stops at the first failed or unacknowledged delete.
pub(crate) async fn enforce_retention(
    admin: &dyn IndexAdmin,
    policy: &IndexPolicy,
    today: CivilDate,
    timeout: Duration,
    verbose: bool,
    report: &mut PolicyReport,
) -> Result<(), LifecycleError> {
    let cutoff = policy.cutoff(today)?;
    report.cutoff = Some(cutoff);

    let snapshot = admin.list_indices(timeout).await?;
    let filter = policy.filter();

    if verbose {
        debug!(
            policy = %policy.base_name(),
            cutoff,
            indices = snapshot.len(),
            "evaluating retention"
        );
    }

    for name in snapshot.keys() {
        let owned = filter.matches(name)
            && filter
                .base_part(name)
                .is_some_and(|base| base.eq_ignore_ascii_case(policy.base_name()));
        if !owned {
            continue;
        }
        let Some(date) = filter.date_suffix(name) else {
            continue;
        };

        if date > cutoff {
            if verbose {
                debug!(index = %name, date, cutoff, "retained");
            }
            continue;
        }

        if !admin.delete_index(name, timeout).await? {
            return Err(LifecycleError::Acknowledgment {
                operation: "delete",
                index: name.clone(),
            });
        }

        info!(policy = %policy.base_name(), index = %name, cutoff, "deleted expired index");
        report.deleted.push(name.clone());
    }

    Ok(())
}
