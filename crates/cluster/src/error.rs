/// Errors talking to the cluster.
///
/// Every variant is transport-class from the caller's point of view: the
/// call did not produce a usable answer and the next cycle may retry.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {target} returned {status}: {body}")]
    Status {
        method: &'static str,
        target: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {target}: {reason}")]
    Decode { target: String, reason: String },

    #[error("Invalid cluster URL: {0}")]
    InvalidUrl(String),

    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClusterError {
    /// Whether the call was cut off by its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Http(e) if e.is_timeout())
    }
}
