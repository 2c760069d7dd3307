use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Shared flag telling whether the managed search process is up.
///
/// Written by the health probe job, read by anything that must not touch the
/// cluster before it has started. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct ProcessHealth {
    started: Arc<AtomicBool>,
}

impl ProcessHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Update the flag, returning the previous value.
    pub fn set_started(&self, started: bool) -> bool {
        self.started.swap(started, Ordering::AcqRel)
    }
}

/// CPU section of the node process stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStats {
    pub percent: Option<i16>,
    pub sys_in_millis: Option<i64>,
    pub user_in_millis: Option<i64>,
    pub total_in_millis: Option<i64>,
}

/// Memory section of the node process stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemStats {
    pub resident_in_bytes: Option<i64>,
    pub share_in_bytes: Option<i64>,
    pub total_virtual_in_bytes: Option<i64>,
}

/// Process statistics of the local node. Fields the engine version does not
/// report stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessStats {
    pub timestamp: Option<i64>,
    pub open_file_descriptors: Option<i64>,
    pub cpu: CpuStats,
    pub mem: MemStats,
}

/// Liveness and process statistics of the local node.
#[async_trait]
pub trait NodeProbe: Send + Sync {
    async fn ping(&self, timeout: Duration) -> Result<(), ClusterError>;

    async fn local_process_stats(&self, timeout: Duration) -> Result<ProcessStats, ClusterError>;
}
