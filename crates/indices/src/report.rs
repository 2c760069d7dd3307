use std::fmt;

use serde::Serialize;
use shardkeeper_scheduler::TaskOutcome;

use crate::error::LifecycleError;

/// What one policy did during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyReport {
    pub index_name: String,
    /// Retention cutoff suffix, once computed.
    pub cutoff: Option<u32>,
    pub deleted: Vec<String>,
    pub created: Vec<String>,
    /// Precreation targets that already existed.
    pub already_present: usize,
    pub error: Option<String>,
}

impl PolicyReport {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Default::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-policy results of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub policies: Vec<PolicyReport>,
    /// Policies skipped because an earlier one failed in abort mode.
    pub unprocessed: Vec<String>,
}

impl CycleReport {
    pub fn failures(&self) -> impl Iterator<Item = &PolicyReport> {
        self.policies.iter().filter(|p| p.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn deleted_count(&self) -> usize {
        self.policies.iter().map(|p| p.deleted.len()).sum()
    }

    pub fn created_count(&self) -> usize {
        self.policies.iter().map(|p| p.created.len()).sum()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} policies, {} deleted, {} created",
            self.policies.len(),
            self.deleted_count(),
            self.created_count()
        )?;
        for failed in self.failures() {
            if let Some(error) = &failed.error {
                write!(f, "; {} failed: {}", failed.index_name, error)?;
            }
        }
        if !self.unprocessed.is_empty() {
            write!(f, "; not processed: {}", self.unprocessed.join(", "))?;
        }
        Ok(())
    }
}

/// Result of one lifecycle cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A gate was closed; nothing was sent to the cluster.
    Skipped(String),
    Succeeded(CycleReport),
    /// At least one policy failed.
    PartiallyFailed(CycleReport),
    /// The cycle failed before any policy ran.
    Failed(LifecycleError),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Succeeded(r) | CycleOutcome::PartiallyFailed(r) => Some(r),
            _ => None,
        }
    }
}

impl From<CycleOutcome> for TaskOutcome {
    fn from(outcome: CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::Skipped(reason) => TaskOutcome::skipped(reason),
            CycleOutcome::Succeeded(report) => TaskOutcome::succeeded(report.to_string()),
            CycleOutcome::PartiallyFailed(report) => TaskOutcome::failed(report.to_string()),
            CycleOutcome::Failed(error) => TaskOutcome::failed(error.to_string()),
        }
    }
}
