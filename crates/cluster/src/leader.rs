use std::time::Duration;

use async_trait::async_trait;

use crate::error::ClusterError;

/// Answers whether this node is currently the cluster's elected master.
///
/// Implementations must query live state on every call; leadership can move
/// between two maintenance cycles.
#[async_trait]
pub trait LeadershipCheck: Send + Sync {
    async fn is_current_node_leader(&self, timeout: Duration) -> Result<bool, ClusterError>;
}
