//! Background jobs watching the managed search process.

pub mod health;
pub mod stats;

pub use health::{EngineHealthMonitor, HEALTH_JOB_NAME};
pub use stats::{ProcessStatsMonitor, ProcessStatsSnapshot, STATS_JOB_NAME};
