//! Lifecycle management for time-partitioned indices.
//!
//! Each cycle, [`IndexLifecycleManager`] checks that it may run (engine
//! started, local node elected master, maintenance enabled), re-reads the
//! [`IndexPolicy`] list from configuration and, per policy, deletes indices
//! whose date suffix has aged past the retention window and pre-creates the
//! indices of the upcoming window.

pub mod error;
pub mod filter;
pub mod manager;
pub mod policy;
mod precreate;
pub mod report;
mod retention;

pub use error::{ErrorKind, LifecycleError};
pub use filter::IndexNameFilter;
pub use manager::{EnvSettings, IndexLifecycleManager, SettingsSource, JOB_NAME};
pub use policy::{parse_document, parse_policies, FilterSpec, IndexPolicy, PolicySpec};
pub use report::{CycleOutcome, CycleReport, PolicyReport};
