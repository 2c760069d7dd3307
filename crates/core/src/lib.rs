pub mod config;
pub mod date;
pub mod error;

pub use config::{ClusterConfig, Config, IndexManagementConfig, MonitorConfig, PolicyFailureMode};
pub use date::{CivilDate, Granularity};
pub use error::*;
