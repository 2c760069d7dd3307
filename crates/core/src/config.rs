use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::KeeperError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub cluster: ClusterConfig,
    pub indices: IndexManagementConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// When `profile` is set (e.g. `PROD`), every key is first looked up as
    /// `{PROFILE}_{KEY}`, falling back to `{KEY}`. Empty string = default.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            cluster: ClusterConfig::from_env_profiled(p),
            indices: IndexManagementConfig::from_env_profiled(p),
            monitor: MonitorConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs. Policy text is not logged.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  cluster:  url={}, request_timeout={}ms", self.cluster.url, self.cluster.request_timeout_ms);
        tracing::info!(
            "  indices:  enabled={}, hour={}, timeout={}ms, failure_mode={}, source={}",
            self.indices.auto_creation_enabled,
            self.indices.scheduled_hour,
            self.indices.timeout_ms,
            self.indices.failure_mode,
            self.indices
                .metadata_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "inline".to_string()),
        );
        tracing::info!(
            "  monitor:  stats_every={}s, health_every={}s",
            self.monitor.stats_interval_secs,
            self.monitor.health_interval_secs
        );
    }
}

// ── Cluster ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the managed node's REST endpoint.
    pub url: String,
    /// Timeout for lightweight probe and stats calls.
    pub request_timeout_ms: u64,
}

impl ClusterConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "ES_URL", "http://127.0.0.1:9200"),
            request_timeout_ms: profiled_env_u64(p, "CLUSTER_REQUEST_TIMEOUT_MS", 5_000),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ── Index management ──────────────────────────────────────────

/// What happens to the remaining policies of a cycle once one policy fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFailureMode {
    /// Stop the cycle at the first failing policy.
    #[default]
    Abort,
    /// Keep going and report every failure at the end of the cycle.
    Continue,
}

impl FromStr for PolicyFailureMode {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" | "isolate" => Ok(Self::Continue),
            other => Err(KeeperError::Config(format!(
                "unknown policy failure mode: {other} (expected abort or continue)"
            ))),
        }
    }
}

impl std::fmt::Display for PolicyFailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyFailureMode::Abort => write!(f, "abort"),
            PolicyFailureMode::Continue => write!(f, "continue"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManagementConfig {
    pub auto_creation_enabled: bool,
    /// Inline JSON array of index policies.
    pub metadata: String,
    /// File holding the policy array; takes precedence over `metadata`.
    pub metadata_file: Option<PathBuf>,
    /// Hour of day (local clock) the maintenance job fires.
    pub scheduled_hour: u32,
    /// Per-call timeout for admin operations.
    pub timeout_ms: u64,
    pub debug_logging_enabled: bool,
    pub failure_mode: PolicyFailureMode,
}

impl Default for IndexManagementConfig {
    fn default() -> Self {
        Self {
            auto_creation_enabled: false,
            metadata: "[]".to_string(),
            metadata_file: None,
            scheduled_hour: 0,
            timeout_ms: 300_000,
            debug_logging_enabled: false,
            failure_mode: PolicyFailureMode::Abort,
        }
    }
}

impl IndexManagementConfig {
    /// Read the index management section for a profile.
    ///
    /// Called once per maintenance cycle, so edits to the environment or the
    /// policy file are picked up without a restart.
    pub fn from_env_profiled(p: &str) -> Self {
        let failure_mode = match profiled_env_opt(p, "INDEX_POLICY_FAILURE_MODE") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to abort failure mode");
                PolicyFailureMode::Abort
            }),
            None => PolicyFailureMode::Abort,
        };

        Self {
            auto_creation_enabled: profiled_env_bool(p, "INDEX_AUTO_CREATION_ENABLED", false),
            metadata: profiled_env_or(p, "INDEX_METADATA", "[]"),
            metadata_file: profiled_env_opt(p, "INDEX_METADATA_FILE").map(PathBuf::from),
            scheduled_hour: profiled_env_u32(p, "AUTO_CREATE_INDEX_SCHEDULED_HOUR", 0),
            timeout_ms: profiled_env_u64(p, "AUTO_CREATE_INDEX_TIMEOUT_MS", 300_000),
            debug_logging_enabled: profiled_env_bool(p, "DEBUG_LOGGING_ENABLED", false),
            failure_mode,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Raw policy document: the file contents when a file is configured,
    /// otherwise the inline value.
    pub fn policy_document(&self) -> Result<String, KeeperError> {
        match &self.metadata_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                KeeperError::Config(format!("cannot read policy file {}: {}", path.display(), e))
            }),
            None => Ok(self.metadata.clone()),
        }
    }
}

// ── Monitoring jobs ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub stats_interval_secs: u64,
    pub health_interval_secs: u64,
}

impl MonitorConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            stats_interval_secs: profiled_env_u64(p, "STATS_SAMPLE_INTERVAL_SECS", 60),
            health_interval_secs: profiled_env_u64(p, "HEALTH_PROBE_INTERVAL_SECS", 10),
        }
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_without_env() {
        let cfg = Config::for_profile("CFGTESTEMPTY");
        assert_eq!(cfg.profile_label(), "CFGTESTEMPTY");
        assert!(!cfg.indices.auto_creation_enabled);
        assert_eq!(cfg.indices.failure_mode, PolicyFailureMode::Abort);
        assert_eq!(cfg.monitor.stats_interval_secs, 60);
    }

    #[test]
    fn profile_prefix_wins() {
        std::env::set_var("CFGTESTA_INDEX_AUTO_CREATION_ENABLED", "TRUE");
        std::env::set_var("CFGTESTA_AUTO_CREATE_INDEX_SCHEDULED_HOUR", "3");
        std::env::set_var("CFGTESTA_INDEX_POLICY_FAILURE_MODE", "continue");

        let cfg = IndexManagementConfig::from_env_profiled("CFGTESTA");
        assert!(cfg.auto_creation_enabled);
        assert_eq!(cfg.scheduled_hour, 3);
        assert_eq!(cfg.failure_mode, PolicyFailureMode::Continue);

        std::env::remove_var("CFGTESTA_INDEX_AUTO_CREATION_ENABLED");
        std::env::remove_var("CFGTESTA_AUTO_CREATE_INDEX_SCHEDULED_HOUR");
        std::env::remove_var("CFGTESTA_INDEX_POLICY_FAILURE_MODE");
    }

    #[test]
    fn failure_mode_parse() {
        assert_eq!("Abort".parse::<PolicyFailureMode>().unwrap(), PolicyFailureMode::Abort);
        assert_eq!("isolate".parse::<PolicyFailureMode>().unwrap(), PolicyFailureMode::Continue);
        assert!("sometimes".parse::<PolicyFailureMode>().is_err());
    }

    #[test]
    fn policy_document_prefers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"indexName":"logs"}}]"#).unwrap();

        let cfg = IndexManagementConfig {
            metadata: "[]".to_string(),
            metadata_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(cfg.policy_document().unwrap(), r#"[{"indexName":"logs"}]"#);
    }

    #[test]
    fn policy_document_missing_file() {
        let cfg = IndexManagementConfig {
            metadata_file: Some(PathBuf::from("/nonexistent/shardkeeper/policies.json")),
            ..Default::default()
        };
        match cfg.policy_document() {
            Err(KeeperError::Config(msg)) => assert!(msg.contains("policies.json")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }
}
