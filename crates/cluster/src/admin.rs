use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Status of one index as reported by the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// `green`, `yellow` or `red`; absent for closed indices.
    pub health: Option<String>,
    /// `open` or `close`.
    pub status: Option<String>,
    pub docs_count: Option<u64>,
}

/// Index name to status, as fetched in a single call.
pub type IndexSnapshot = BTreeMap<String, IndexStatus>;

/// Index administration on the managed cluster.
///
/// Every call carries its own timeout. Mutating calls return the cluster's
/// acknowledgment flag; `Ok(false)` means the request was accepted but not
/// confirmed.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    async fn list_indices(&self, timeout: Duration) -> Result<IndexSnapshot, ClusterError>;

    async fn index_exists(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError>;

    async fn create_index(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError>;

    async fn delete_index(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError>;
}
