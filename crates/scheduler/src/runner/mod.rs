//! Scheduler runner -- owns the job registry and drives one loop per job.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, registration, and accessor methods
//! - `execution`: per-job loop, panic-isolated invocation, and shutdown handle

mod core;
mod execution;

pub use self::core::Scheduler;
pub use self::execution::SchedulerHandle;
