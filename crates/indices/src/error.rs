use shardkeeper_cluster::ClusterError;
use shardkeeper_core::KeeperError;

/// Coarse class of a [`LifecycleError`], used for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Acknowledgment,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::Acknowledgment => "acknowledgment",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Bad policy document, unsupported granularity or unusable date math.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The cluster could not be reached or answered with an error.
    #[error("Transport error: {0}")]
    Transport(#[from] ClusterError),

    /// The cluster accepted a mutation but did not acknowledge it.
    #[error("{operation} of index {index} was not acknowledged")]
    Acknowledgment {
        operation: &'static str,
        index: String,
    },

    /// Creating an index failed; reported as an acknowledgment failure.
    #[error("creation of index {index} failed: {source}")]
    CreateFailed {
        index: String,
        #[source]
        source: ClusterError,
    },
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Configuration(_) => ErrorKind::Configuration,
            LifecycleError::Transport(_) => ErrorKind::Transport,
            LifecycleError::Acknowledgment { .. } | LifecycleError::CreateFailed { .. } => {
                ErrorKind::Acknowledgment
            }
        }
    }
}

impl From<KeeperError> for LifecycleError {
    fn from(e: KeeperError) -> Self {
        match e {
            KeeperError::Config(msg) => LifecycleError::Configuration(msg),
            other => LifecycleError::Configuration(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(e: serde_json::Error) -> Self {
        LifecycleError::Configuration(format!("invalid index policy document: {e}"))
    }
}
