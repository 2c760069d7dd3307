use serde::{Deserialize, Serialize};
use shardkeeper_core::{CivilDate, Granularity};

use crate::error::LifecycleError;
use crate::filter::IndexNameFilter;

/// Optional `indexNameFilter` block of a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub separator: String,
    pub date_pattern: Option<String>,
}

/// One element of the policy document, as written in configuration.
///
/// Validation happens in [`PolicySpec::validate`] so that one bad policy can
/// be reported on its own instead of rejecting the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    pub index_name: String,
    #[serde(default)]
    pub index_name_filter: Option<FilterSpec>,
    pub retention_period: i64,
    pub retention_type: String,
    #[serde(default)]
    pub pre_create: bool,
}

impl PolicySpec {
    pub fn validate(&self) -> Result<IndexPolicy, LifecycleError> {
        let base_name = self.index_name.trim();
        if base_name.is_empty() {
            return Err(LifecycleError::Configuration(
                "policy with empty indexName".to_string(),
            ));
        }
        if base_name.contains(':') {
            return Err(LifecycleError::Configuration(format!(
                "policy {base_name}: indexName must not reference a remote cluster"
            )));
        }

        let retention_period = u32::try_from(self.retention_period).map_err(|_| {
            LifecycleError::Configuration(format!(
                "policy {base_name}: retentionPeriod must be a non-negative integer, got {}",
                self.retention_period
            ))
        })?;

        let granularity: Granularity = self
            .retention_type
            .parse()
            .map_err(|e| LifecycleError::Configuration(format!("policy {base_name}: {e}")))?;

        let filter_spec = self.index_name_filter.clone().unwrap_or_default();
        if let Some(pattern) = &filter_spec.date_pattern {
            let implied = Granularity::from_date_pattern(pattern)
                .map_err(|e| LifecycleError::Configuration(format!("policy {base_name}: {e}")))?;
            if implied != granularity {
                return Err(LifecycleError::Configuration(format!(
                    "policy {base_name}: datePattern {} does not fit retentionType {}",
                    pattern, granularity
                )));
            }
        }

        Ok(IndexPolicy {
            filter: IndexNameFilter::new(base_name, filter_spec.separator, granularity),
            retention_period,
            pre_create: self.pre_create,
        })
    }
}

/// A validated retention / precreation rule for one family of indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPolicy {
    filter: IndexNameFilter,
    retention_period: u32,
    pre_create: bool,
}

impl IndexPolicy {
    pub fn base_name(&self) -> &str {
        self.filter.base_name()
    }

    pub fn filter(&self) -> &IndexNameFilter {
        &self.filter
    }

    pub fn granularity(&self) -> Granularity {
        self.filter.granularity()
    }

    pub fn retention_period(&self) -> u32 {
        self.retention_period
    }

    pub fn pre_create(&self) -> bool {
        self.pre_create
    }

    /// Newest date suffix that is old enough to delete.
    pub fn cutoff(&self, today: CivilDate) -> Result<u32, LifecycleError> {
        let oldest_kept = today.shift(self.granularity(), -i64::from(self.retention_period))?;
        Ok(oldest_kept.suffix(self.granularity()))
    }

    /// Names of the indices covering `today` and the following
    /// `retention_period - 1` units, oldest first.
    pub fn precreation_targets(&self, today: CivilDate) -> Result<Vec<String>, LifecycleError> {
        (0..i64::from(self.retention_period))
            .map(|offset| -> Result<String, LifecycleError> {
                let date = today.shift(self.granularity(), offset)?;
                Ok(self.filter.index_name(date))
            })
            .collect()
    }
}

/// Parse the policy document into unvalidated specs.
///
/// Only a document that is not a JSON array of policy objects fails here.
pub fn parse_document(text: &str) -> Result<Vec<PolicySpec>, LifecycleError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

/// Parse and validate every policy, failing on the first invalid one.
pub fn parse_policies(text: &str) -> Result<Vec<IndexPolicy>, LifecycleError> {
    parse_document(text)?
        .iter()
        .map(PolicySpec::validate)
        .collect()
}
