use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::admin::{IndexAdmin, IndexSnapshot, IndexStatus};
use crate::error::ClusterError;
use crate::health::{NodeProbe, ProcessStats};
use crate::leader::LeadershipCheck;

/// A call observed by [`InMemoryCluster`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    ListIndices,
    IndexExists(String),
    CreateIndex(String),
    DeleteIndex(String),
    LeaderCheck,
    Ping,
    ProcessStats,
}

impl ClusterCall {
    fn is_admin(&self) -> bool {
        matches!(
            self,
            ClusterCall::ListIndices
                | ClusterCall::IndexExists(_)
                | ClusterCall::CreateIndex(_)
                | ClusterCall::DeleteIndex(_)
        )
    }
}

#[derive(Debug)]
struct State {
    indices: IndexSnapshot,
    calls: Vec<ClusterCall>,
    leader: bool,
    reachable: bool,
    fail_listing: bool,
    fail_leader_check: bool,
    rejected_deletes: BTreeSet<String>,
    failing_creates: BTreeSet<String>,
    unacked_creates: BTreeSet<String>,
    process_stats: Option<ProcessStats>,
}

/// In-process cluster for tests and local runs.
///
/// Starts reachable, with the local node as leader and no indices. Failure
/// injection is per index name so a test can fail one call in a sequence.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryCluster {
    state: Arc<Mutex<State>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                indices: BTreeMap::new(),
                calls: Vec::new(),
                leader: true,
                reachable: true,
                fail_listing: false,
                fail_leader_check: false,
                rejected_deletes: BTreeSet::new(),
                failing_creates: BTreeSet::new(),
                unacked_creates: BTreeSet::new(),
                process_stats: None,
            })),
        }
    }

    pub fn with_indices<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cluster = Self::new();
        for name in names {
            cluster.add_index(name);
        }
        cluster
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_index(&self, name: impl Into<String>) {
        self.lock().indices.insert(name.into(), open_index());
    }

    pub fn index_names(&self) -> Vec<String> {
        self.lock().indices.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.lock().calls.clone()
    }

    /// Calls made through [`IndexAdmin`] only.
    pub fn admin_calls(&self) -> Vec<ClusterCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_admin())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn set_leader(&self, leader: bool) {
        self.lock().leader = leader;
    }

    /// Make every call fail as if the node were down.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Answer deletes of `name` with `acknowledged: false`.
    pub fn reject_delete(&self, name: impl Into<String>) {
        self.lock().rejected_deletes.insert(name.into());
    }

    /// Fail creates of `name` with a server error.
    pub fn fail_create(&self, name: impl Into<String>) {
        self.lock().failing_creates.insert(name.into());
    }

    /// Create `name` but answer with `acknowledged: false`.
    pub fn unack_create(&self, name: impl Into<String>) {
        self.lock().unacked_creates.insert(name.into());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    pub fn fail_leader_check(&self, fail: bool) {
        self.lock().fail_leader_check = fail;
    }

    pub fn set_process_stats(&self, stats: ProcessStats) {
        self.lock().process_stats = Some(stats);
    }

    /// Record `call` and fail if the node is unreachable.
    fn enter(&self, call: ClusterCall) -> Result<MutexGuard<'_, State>, ClusterError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.reachable {
            Ok(state)
        } else {
            Err(ClusterError::Unavailable("node unreachable".to_string()))
        }
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn open_index() -> IndexStatus {
    IndexStatus {
        health: Some("green".to_string()),
        status: Some("open".to_string()),
        docs_count: Some(0),
    }
}

fn server_error(method: &'static str, target: &str) -> ClusterError {
    ClusterError::Status {
        method,
        target: target.to_string(),
        status: 500,
        body: "injected failure".to_string(),
    }
}

#[async_trait]
impl IndexAdmin for InMemoryCluster {
    async fn list_indices(&self, _timeout: Duration) -> Result<IndexSnapshot, ClusterError> {
        let state = self.enter(ClusterCall::ListIndices)?;
        if state.fail_listing {
            return Err(server_error("GET", "_cat/indices"));
        }
        Ok(state.indices.clone())
    }

    async fn index_exists(&self, name: &str, _timeout: Duration) -> Result<bool, ClusterError> {
        let state = self.enter(ClusterCall::IndexExists(name.to_string()))?;
        Ok(state.indices.contains_key(name))
    }

    async fn create_index(&self, name: &str, _timeout: Duration) -> Result<bool, ClusterError> {
        let mut state = self.enter(ClusterCall::CreateIndex(name.to_string()))?;
        if state.failing_creates.contains(name) {
            return Err(server_error("PUT", name));
        }
        if state.indices.contains_key(name) {
            return Err(ClusterError::Status {
                method: "PUT",
                target: name.to_string(),
                status: 400,
                body: "resource_already_exists_exception".to_string(),
            });
        }
        state.indices.insert(name.to_string(), open_index());
        Ok(!state.unacked_creates.contains(name))
    }

    async fn delete_index(&self, name: &str, _timeout: Duration) -> Result<bool, ClusterError> {
        let mut state = self.enter(ClusterCall::DeleteIndex(name.to_string()))?;
        if state.rejected_deletes.contains(name) {
            return Ok(false);
        }
        if state.indices.remove(name).is_none() {
            return Err(ClusterError::Status {
                method: "DELETE",
                target: name.to_string(),
                status: 404,
                body: "index_not_found_exception".to_string(),
            });
        }
        Ok(true)
    }
}

#[async_trait]
impl LeadershipCheck for InMemoryCluster {
    async fn is_current_node_leader(&self, _timeout: Duration) -> Result<bool, ClusterError> {
        let state = self.enter(ClusterCall::LeaderCheck)?;
        if state.fail_leader_check {
            return Err(server_error("GET", "_cat/master"));
        }
        Ok(state.leader)
    }
}

#[async_trait]
impl NodeProbe for InMemoryCluster {
    async fn ping(&self, _timeout: Duration) -> Result<(), ClusterError> {
        self.enter(ClusterCall::Ping).map(|_| ())
    }

    async fn local_process_stats(&self, _timeout: Duration) -> Result<ProcessStats, ClusterError> {
        let state = self.enter(ClusterCall::ProcessStats)?;
        state
            .process_stats
            .clone()
            .ok_or_else(|| ClusterError::Decode {
                target: "_nodes/_local/stats/process".to_string(),
                reason: "no process section".to_string(),
            })
    }
}
